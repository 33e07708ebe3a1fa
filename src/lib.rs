//! editelf: in-place ELF relocation editor
//!
//! This library edits 32-bit ELF images before they are handed to an
//! external strip executable. It clears the symbol-table-index bits of every
//! relocation entry while preserving the relocation type, so a destructive
//! strip of the symbol table cannot leave relocations pointing at removed
//! symbols. Every other byte of the image is left untouched.
//!
//! # Example
//!
//! ```no_run
//! use editelf::ElfEditor;
//!
//! // Open an ELF object
//! let editor = ElfEditor::open("firmware.o").unwrap();
//!
//! // Write a copy with all relocation symbol references cleared
//! editor.save("firmware.stripped-refs.o").unwrap();
//! ```

pub mod codec;
pub mod elf;
pub mod error;
pub mod strip;

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;

pub use codec::Encoding;
pub use codec::FieldKind;
pub use codec::FixedRecord;
pub use elf::clear_symbol_references;
pub use elf::Class;
pub use elf::Ehdr32;
pub use elf::ElfParser;
pub use elf::Ident;
pub use elf::Rel32;
pub use elf::RelocationTable;
pub use elf::SectionTable;
pub use elf::Shdr32;
pub use error::ElfError;
pub use error::StripError;
pub use strip::StripCommand;

/// Clear relocation symbol references in an ELF image held in memory
///
/// Pure form of the rewrite: the input bytes are copied, edited in the copy
/// and returned. The output has the same length as the input, with only
/// relocation-entry info fields changed.
pub fn remove_symbol_references(data: &[u8]) -> Result<Vec<u8>, ElfError> {
    let mut cursor = Cursor::new(data.to_vec());
    clear_symbol_references(&mut cursor)?;
    Ok(cursor.into_inner())
}

/// High-level API for editing ELF files on disk
///
/// Opening a file parses and validates its identification and file header;
/// the relocation rewrite itself happens on a copy when [`ElfEditor::save`]
/// is called, so the opened file is never mutated.
pub struct ElfEditor {
    path: PathBuf,
    ident: Ident,
    header: Ehdr32,
}

impl ElfEditor {
    /// Open an ELF file and validate its structure
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ElfError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let parser = ElfParser::new(file)?;
        let ident = *parser.ident();
        let header = parser.header().clone();

        Ok(Self {
            path,
            ident,
            header,
        })
    }

    /// Get the path to the ELF file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte order of the image
    pub fn encoding(&self) -> Encoding {
        self.ident.encoding
    }

    /// Number of section header table entries
    pub fn section_count(&self) -> u16 {
        self.header.e_shnum
    }

    /// Get access to the decoded file header
    pub fn header(&self) -> &Ehdr32 {
        &self.header
    }

    /// Save a copy with all relocation symbol references cleared
    ///
    /// Copies the input byte-for-byte to `output_path`, then rewrites the
    /// copy in place. Returns the number of relocation entries rewritten.
    pub fn save(&self, output_path: impl AsRef<Path>) -> Result<u64, ElfError> {
        let mut input = File::open(&self.path)?;
        let mut output = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(output_path)?;
        io::copy(&mut input, &mut output)?;
        clear_symbol_references(&mut output)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use byteorder::LittleEndian;
    use byteorder::WriteBytesExt;
    use tempfile::TempDir;

    use super::*;
    use crate::elf::ELF_MAGIC;
    use crate::elf::SHT_REL;

    /// Minimal little-endian ELF32 object: one SHT_NULL section and one
    /// SHT_REL section holding a single entry at file offset 52.
    fn build_test_object(rel_info: u32) -> Vec<u8> {
        let mut image = Vec::new();
        image.extend_from_slice(&ELF_MAGIC);
        image.extend_from_slice(&[1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

        // Elf32_Ehdr: section table at offset 60, two entries
        image.write_u16::<LittleEndian>(1).unwrap(); // e_type = ET_REL
        image.write_u16::<LittleEndian>(3).unwrap(); // e_machine = EM_386
        image.write_u32::<LittleEndian>(1).unwrap(); // e_version
        image.write_u32::<LittleEndian>(0).unwrap(); // e_entry
        image.write_u32::<LittleEndian>(0).unwrap(); // e_phoff
        image.write_u32::<LittleEndian>(60).unwrap(); // e_shoff
        image.write_u32::<LittleEndian>(0).unwrap(); // e_flags
        for half in [52u16, 0, 0, 40, 2, 0] {
            image.write_u16::<LittleEndian>(half).unwrap();
        }

        // The relocation entry
        image.write_u32::<LittleEndian>(0x2000).unwrap();
        image.write_u32::<LittleEndian>(rel_info).unwrap();

        // Section 0: SHT_NULL
        for _ in 0..10 {
            image.write_u32::<LittleEndian>(0).unwrap();
        }
        // Section 1: SHT_REL over bytes 52..60
        for word in [0, SHT_REL, 0, 0, 52, 8, 0, 0, 4, 8] {
            image.write_u32::<LittleEndian>(word).unwrap();
        }
        image
    }

    #[test]
    fn test_remove_symbol_references_pure() {
        let image = build_test_object(0x0000_0105);
        let edited = remove_symbol_references(&image).unwrap();

        assert_eq!(edited.len(), image.len());
        assert_eq!(&edited[56..60], &[0x05, 0, 0, 0]);
        // Everything before the info field is untouched
        assert_eq!(&edited[..56], &image[..56]);
    }

    #[test]
    fn test_remove_symbol_references_rejects_non_elf() {
        let err = remove_symbol_references(b"\x7fELG not an elf at all").unwrap_err();
        assert!(matches!(err, ElfError::InvalidFormat(_)));
    }

    #[test]
    fn test_open_object() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.o");
        std::fs::write(&path, build_test_object(0x105)).unwrap();

        let editor = ElfEditor::open(&path).unwrap();
        assert_eq!(editor.encoding(), Encoding::Little);
        assert_eq!(editor.section_count(), 2);
        assert_eq!(editor.header().e_shoff, 60);
    }

    #[test]
    fn test_save_leaves_input_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.o");
        let output = temp_dir.path().join("test.edited.o");
        let image = build_test_object(0x0000_0105);
        std::fs::write(&path, &image).unwrap();

        let editor = ElfEditor::open(&path).unwrap();
        let cleared = editor.save(&output).unwrap();
        assert_eq!(cleared, 1);

        assert_eq!(std::fs::read(&path).unwrap(), image);
        let edited = std::fs::read(&output).unwrap();
        assert_eq!(edited.len(), image.len());
        assert_eq!(&edited[56..60], &[0x05, 0, 0, 0]);
    }

    #[test]
    fn test_open_rejects_truncated_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("short.o");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&build_test_object(0x105)[..30]).unwrap();
        drop(file);

        assert!(matches!(
            ElfEditor::open(&path),
            Err(ElfError::TruncatedInput { .. })
        ));
    }
}
