// Licensed under the Apache-2.0 license

/// Why the loader could not obtain a blob from its storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadError {
    NotFound,
    Io,
    /// The blob does not fit the buffer it is being read into.
    TooLarge,
}

/// Storage the loader reads the candidate image and its detached signature
/// from. The loader owns the buffers; the source only fills them.
pub trait ImageSource {
    /// Copies the image into the front of `buf` and returns its length.
    fn read_image(&mut self, buf: &mut [u8]) -> Result<usize, LoadError>;

    /// Copies the detached signature into the front of `buf` and returns its length.
    fn read_signature(&mut self, buf: &mut [u8]) -> Result<usize, LoadError>;
}

/// An image and signature that are already memory resident, e.g. staged
/// into RAM by an earlier boot stage.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryImageSource<'s> {
    image: Option<&'s [u8]>,
    signature: Option<&'s [u8]>,
}

impl<'s> MemoryImageSource<'s> {
    pub fn new(image: Option<&'s [u8]>, signature: Option<&'s [u8]>) -> Self {
        Self { image, signature }
    }
}

fn copy_into(src: Option<&[u8]>, buf: &mut [u8]) -> Result<usize, LoadError> {
    let src = src.ok_or(LoadError::NotFound)?;
    let dest = buf.get_mut(..src.len()).ok_or(LoadError::TooLarge)?;
    dest.copy_from_slice(src);
    Ok(src.len())
}

impl ImageSource for MemoryImageSource<'_> {
    fn read_image(&mut self, buf: &mut [u8]) -> Result<usize, LoadError> {
        copy_into(self.image, buf)
    }

    fn read_signature(&mut self, buf: &mut [u8]) -> Result<usize, LoadError> {
        copy_into(self.signature, buf)
    }
}
