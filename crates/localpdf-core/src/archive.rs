//! In-memory ZIP packaging of multi-file results.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

/// Entry written when an image extraction finds nothing.
pub const NO_IMAGES_ENTRY: &str = "no_images_found.txt";

const NO_IMAGES_TEXT: &str = "No images were found in the specified pages.\n\
This could mean:\n\
- The PDF contains no images\n\
- The selected pages contain no images\n\
- The images are in a format that couldn't be extracted\n";

/// Build a deflated archive from `(name, bytes)` entries, in order.
pub fn zip_entries<N, B>(entries: impl IntoIterator<Item = (N, B)>) -> Result<Vec<u8>>
where
    N: Into<String>,
    B: AsRef<[u8]>,
{
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, bytes) in entries {
            zip.start_file(name.into(), options)?;
            zip.write_all(bytes.as_ref())?;
        }
        zip.finish()?;
    }
    Ok(buffer)
}

/// Archive holding only an explanatory note that no images were found.
pub fn no_images_archive() -> Result<Vec<u8>> {
    zip_entries([(NO_IMAGES_ENTRY, NO_IMAGES_TEXT)])
}
