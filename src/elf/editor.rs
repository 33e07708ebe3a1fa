//! ELF parsing and in-place relocation rewriting
//!
//! The parser works against any `Read + Write + Seek` byte store with
//! positioned reads and writes, so the same code drives on-disk scratch files
//! and in-memory cursors. Table walking is arithmetic: a table descriptor
//! knows its offset, extent and entry size and yields entry offsets lazily,
//! which keeps nothing materialized but the handful of descriptors.

use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;

use log::debug;

use crate::codec;
use crate::codec::Encoding;
use crate::codec::FixedRecord;
use crate::codec::record_size;
use crate::error::ElfError;

use super::types::Class;
use super::types::EI_NIDENT;
use super::types::Ehdr32;
use super::types::Ident;
use super::types::Rel32;
use super::types::Shdr32;
use super::types::SHT_REL;

/// Structural parser over one ELF image
///
/// Owns the byte store for the lifetime of one editing pass. Identification
/// and file header are decoded eagerly at construction; everything else is
/// read on demand at absolute offsets.
pub struct ElfParser<B: Read + Write + Seek> {
    buffer: B,
    ident: Ident,
    header: Ehdr32,
}

impl<B: Read + Write + Seek> ElfParser<B> {
    /// Parse identification and file header from the start of the buffer
    pub fn new(mut buffer: B) -> Result<Self, ElfError> {
        let mut ident_bytes = [0u8; EI_NIDENT];
        read_exact_at(&mut buffer, 0, &mut ident_bytes)?;
        let ident = Ident::parse(&ident_bytes)?;

        // The file header starts right after e_ident
        let header = read_record_at::<B, Ehdr32>(&mut buffer, EI_NIDENT as u64, ident.encoding)?;
        debug!(
            "parsed ELF header: {:?} {:?}, {} sections at offset {:#x}",
            ident.class, ident.encoding, header.e_shnum, header.e_shoff
        );

        Ok(Self {
            buffer,
            ident,
            header,
        })
    }

    pub fn ident(&self) -> &Ident {
        &self.ident
    }

    pub fn header(&self) -> &Ehdr32 {
        &self.header
    }

    /// Read and decode one record at an absolute file offset
    pub fn read_record<T: FixedRecord>(&mut self, offset: u64) -> Result<T, ElfError> {
        read_record_at(&mut self.buffer, offset, self.ident.encoding)
    }

    /// Encode one record and write it back at an absolute file offset
    pub fn write_record<T: FixedRecord>(&mut self, record: &T, offset: u64) -> Result<(), ElfError> {
        let buf = codec::encode(record, self.ident.encoding);
        self.buffer.seek(SeekFrom::Start(offset))?;
        self.buffer.write_all(&buf)?;
        Ok(())
    }

    /// Descriptor for this image's section header table
    pub fn sections(&self) -> Result<SectionTable, ElfError> {
        SectionTable::new(self.ident.class, &self.header)
    }

    /// Descriptor for the relocation table held by one section
    pub fn relocations(&self, section: &Shdr32) -> Result<RelocationTable, ElfError> {
        RelocationTable::new(self.ident.class, section)
    }

    /// Rewind and give the byte store back to the caller
    pub fn into_inner(mut self) -> Result<B, ElfError> {
        self.buffer.seek(SeekFrom::Start(0))?;
        Ok(self.buffer)
    }
}

fn read_exact_at<B: Read + Seek>(
    buffer: &mut B,
    offset: u64,
    buf: &mut [u8],
) -> Result<(), ElfError> {
    buffer.seek(SeekFrom::Start(offset))?;
    buffer.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ElfError::TruncatedInput {
            offset,
            needed: buf.len(),
        },
        _ => ElfError::Io(e),
    })
}

fn read_record_at<B: Read + Seek, T: FixedRecord>(
    buffer: &mut B,
    offset: u64,
    encoding: Encoding,
) -> Result<T, ElfError> {
    let mut buf = vec![0u8; record_size::<T>()];
    read_exact_at(buffer, offset, &mut buf)?;
    codec::decode(&buf, encoding)
}

/// The section header table: `e_shnum` fixed-size records at `e_shoff`
///
/// Construction asserts that the advertised `e_shentsize` equals the
/// compiled-in `Shdr32` size; a disagreement means an ELF variant this crate
/// cannot safely interpret and is never glossed over.
#[derive(Debug, Clone, Copy)]
pub struct SectionTable {
    offset: u64,
    count: u64,
    entsize: u64,
}

impl SectionTable {
    pub fn new(class: Class, header: &Ehdr32) -> Result<Self, ElfError> {
        let expected = match class {
            Class::Elf32 => record_size::<Shdr32>(),
            Class::Elf64 => {
                return Err(ElfError::UnsupportedLayout(
                    "64-bit section header table".into(),
                ));
            }
        };
        if usize::from(header.e_shentsize) != expected {
            return Err(ElfError::LayoutMismatch {
                advertised: usize::from(header.e_shentsize),
                expected,
            });
        }
        Ok(Self {
            offset: u64::from(header.e_shoff),
            count: u64::from(header.e_shnum),
            entsize: u64::from(header.e_shentsize),
        })
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Absolute file offset of every table entry, in table order
    pub fn offsets(&self) -> impl Iterator<Item = u64> {
        let start = self.offset;
        let entsize = self.entsize;
        (0..self.count).map(move |i| start + i * entsize)
    }

    /// Lazy sequence of (section header, absolute offset) pairs
    pub fn entries<'a, B: Read + Write + Seek>(
        &self,
        parser: &'a mut ElfParser<B>,
    ) -> impl Iterator<Item = Result<(Shdr32, u64), ElfError>> + 'a {
        self.offsets()
            .map(move |off| parser.read_record::<Shdr32>(off).map(|shdr| (shdr, off)))
    }
}

/// One section's relocation table: `sh_size / sh_entsize` records at
/// `sh_offset`
///
/// Only the (32-bit, `SHT_REL`) layout is implemented. `SHT_RELA` sections
/// are an explicit unsupported-layout failure rather than being skipped, so
/// an image this crate cannot fully rewrite is never half-rewritten.
#[derive(Debug, Clone, Copy)]
pub struct RelocationTable {
    offset: u64,
    count: u64,
    entsize: u64,
}

impl RelocationTable {
    pub fn new(class: Class, section: &Shdr32) -> Result<Self, ElfError> {
        match (class, section.sh_type) {
            (Class::Elf32, SHT_REL) => {}
            (class, sh_type) => {
                return Err(ElfError::UnsupportedLayout(format!(
                    "relocation section type {sh_type} for {class:?}"
                )));
            }
        }
        let expected = record_size::<Rel32>();
        if section.sh_entsize as usize != expected {
            return Err(ElfError::LayoutMismatch {
                advertised: section.sh_entsize as usize,
                expected,
            });
        }
        Ok(Self {
            offset: u64::from(section.sh_offset),
            count: u64::from(section.sh_size / section.sh_entsize),
            entsize: u64::from(section.sh_entsize),
        })
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Absolute file offset of every relocation entry, in ascending order
    pub fn offsets(&self) -> impl Iterator<Item = u64> {
        let start = self.offset;
        let entsize = self.entsize;
        (0..self.count).map(move |i| start + i * entsize)
    }

    /// Lazy sequence of (relocation record, absolute offset) pairs
    pub fn entries<'a, B: Read + Write + Seek>(
        &self,
        parser: &'a mut ElfParser<B>,
    ) -> impl Iterator<Item = Result<(Rel32, u64), ElfError>> + 'a {
        self.offsets()
            .map(move |off| parser.read_record::<Rel32>(off).map(|rel| (rel, off)))
    }
}

/// Zero the symbol table index of every relocation entry, in place
///
/// Walks the section table once, collects a descriptor per relocation
/// section, then rewrites each entry at its own offset: `r_info` keeps its
/// low 8 type bits and loses the high symbol-index bits. No other byte of
/// the image is touched. Returns the number of entries rewritten with the
/// buffer rewound to its start.
pub fn clear_symbol_references<B: Read + Write + Seek>(buffer: &mut B) -> Result<u64, ElfError> {
    let mut parser = ElfParser::new(&mut *buffer)?;
    let class = parser.ident().class;
    let sections = parser.sections()?;

    // A relocation table descriptor is three words; collecting them first
    // keeps the nested walk free of overlapping borrows.
    let mut tables = Vec::new();
    for entry in sections.entries(&mut parser) {
        let (section, _) = entry?;
        if section.is_relocation() {
            tables.push(RelocationTable::new(class, &section)?);
        }
    }

    let mut cleared = 0u64;
    for table in &tables {
        for offset in table.offsets() {
            let mut rel: Rel32 = parser.read_record(offset)?;
            rel.clear_symbol_index();
            parser.write_record(&rel, offset)?;
            cleared += 1;
        }
    }
    debug!(
        "cleared {} symbol references across {} relocation sections",
        cleared,
        tables.len()
    );

    buffer.seek(SeekFrom::Start(0))?;
    Ok(cleared)
}
