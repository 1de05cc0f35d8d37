//! Rendering of notebook pages: ruling geometry, text layout, painting and
//! rasterization to PNG.

pub mod layout;
pub mod paint;
pub mod raster;
pub mod ruling;

use sha2::{Digest, Sha256};

/// An encoded PNG image ready to be handed to a download sink.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

impl ImageBlob {
    pub fn len(&self) -> usize {
        self.png_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.png_data.is_empty()
    }

    /// Hex SHA-256 of the encoded bytes
    pub fn sha256(&self) -> String {
        hex::encode(Sha256::digest(&self.png_data))
    }
}
