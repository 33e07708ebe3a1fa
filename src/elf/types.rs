//! ELF structure definitions: identification, file header, section header,
//! relocation entry
//!
//! Only the ELF32 layouts are compiled in. Field names follow the ELF
//! specification so they can be checked against `elf.h` directly.

use crate::codec::Encoding;
use crate::codec::FieldKind;
use crate::codec::FixedRecord;
use crate::error::ElfError;

/// ELF magic number bytes
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Length of the e_ident block at the start of every ELF file
pub const EI_NIDENT: usize = 16;

/// Section holds relocation entries with explicit addends (Elf32_Rela)
pub const SHT_RELA: u32 = 4;

/// Section holds relocation entries without addends (Elf32_Rel)
pub const SHT_REL: u32 = 9;

/// EI_CLASS: word size of the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Elf32,
    Elf64,
}

/// Parsed e_ident block
///
/// Holds the two identification attributes everything downstream depends on.
/// Parsing rejects anything this crate cannot safely edit, so a constructed
/// `Ident` always describes a 32-bit image.
#[derive(Debug, Clone, Copy)]
pub struct Ident {
    pub class: Class,
    pub encoding: Encoding,
}

impl Ident {
    /// Parse the 16 identification bytes at the start of an ELF file
    pub fn parse(bytes: &[u8; EI_NIDENT]) -> Result<Self, ElfError> {
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if magic != ELF_MAGIC {
            return Err(ElfError::InvalidFormat(magic));
        }

        // EI_CLASS at index 4, EI_DATA at index 5
        let class = match bytes[4] {
            1 => Class::Elf32,
            value => {
                return Err(ElfError::UnsupportedFormat {
                    what: "class",
                    value,
                });
            }
        };
        let encoding = match bytes[5] {
            1 => Encoding::Little,
            2 => Encoding::Big,
            value => {
                return Err(ElfError::UnsupportedFormat {
                    what: "data encoding",
                    value,
                });
            }
        };

        Ok(Self { class, encoding })
    }
}

/// Elf32_Ehdr without the leading e_ident block
#[derive(Debug, Clone)]
pub struct Ehdr32 {
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

impl FixedRecord for Ehdr32 {
    const LAYOUT: &'static [FieldKind] = &[
        FieldKind::U16, // e_type
        FieldKind::U16, // e_machine
        FieldKind::U32, // e_version
        FieldKind::U32, // e_entry
        FieldKind::U32, // e_phoff
        FieldKind::U32, // e_shoff
        FieldKind::U32, // e_flags
        FieldKind::U16, // e_ehsize
        FieldKind::U16, // e_phentsize
        FieldKind::U16, // e_phnum
        FieldKind::U16, // e_shentsize
        FieldKind::U16, // e_shnum
        FieldKind::U16, // e_shstrndx
    ];

    fn from_fields(fields: &[u32]) -> Self {
        Self {
            e_type: fields[0] as u16,
            e_machine: fields[1] as u16,
            e_version: fields[2],
            e_entry: fields[3],
            e_phoff: fields[4],
            e_shoff: fields[5],
            e_flags: fields[6],
            e_ehsize: fields[7] as u16,
            e_phentsize: fields[8] as u16,
            e_phnum: fields[9] as u16,
            e_shentsize: fields[10] as u16,
            e_shnum: fields[11] as u16,
            e_shstrndx: fields[12] as u16,
        }
    }

    fn to_fields(&self) -> Vec<u32> {
        vec![
            u32::from(self.e_type),
            u32::from(self.e_machine),
            self.e_version,
            self.e_entry,
            self.e_phoff,
            self.e_shoff,
            self.e_flags,
            u32::from(self.e_ehsize),
            u32::from(self.e_phentsize),
            u32::from(self.e_phnum),
            u32::from(self.e_shentsize),
            u32::from(self.e_shnum),
            u32::from(self.e_shstrndx),
        ]
    }
}

/// Elf32_Shdr
#[derive(Debug, Clone)]
pub struct Shdr32 {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u32,
    pub sh_addr: u32,
    pub sh_offset: u32,
    pub sh_size: u32,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u32,
    pub sh_entsize: u32,
}

impl Shdr32 {
    /// Does this section hold relocation entries (with or without addends)?
    pub fn is_relocation(&self) -> bool {
        matches!(self.sh_type, SHT_REL | SHT_RELA)
    }
}

impl FixedRecord for Shdr32 {
    const LAYOUT: &'static [FieldKind] = &[FieldKind::U32; 10];

    fn from_fields(fields: &[u32]) -> Self {
        Self {
            sh_name: fields[0],
            sh_type: fields[1],
            sh_flags: fields[2],
            sh_addr: fields[3],
            sh_offset: fields[4],
            sh_size: fields[5],
            sh_link: fields[6],
            sh_info: fields[7],
            sh_addralign: fields[8],
            sh_entsize: fields[9],
        }
    }

    fn to_fields(&self) -> Vec<u32> {
        vec![
            self.sh_name,
            self.sh_type,
            self.sh_flags,
            self.sh_addr,
            self.sh_offset,
            self.sh_size,
            self.sh_link,
            self.sh_info,
            self.sh_addralign,
            self.sh_entsize,
        ]
    }
}

/// Elf32_Rel
///
/// `r_info` packs the symbol table index in the high 24 bits and the
/// processor-specific relocation type in the low 8 bits (the ELF32 packing;
/// ELF64 packs these differently and is rejected at identification).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rel32 {
    pub r_offset: u32,
    pub r_info: u32,
}

impl Rel32 {
    /// Processor-specific relocation type (ELF32_R_TYPE)
    pub fn reloc_type(&self) -> u8 {
        (self.r_info & 0xff) as u8
    }

    /// Symbol table index this relocation refers to (ELF32_R_SYM)
    pub fn symbol_index(&self) -> u32 {
        self.r_info >> 8
    }

    /// Drop the symbol reference, keeping the relocation type.
    /// Index 0 is STN_UNDEF.
    pub fn clear_symbol_index(&mut self) {
        self.r_info &= 0xff;
    }
}

impl FixedRecord for Rel32 {
    const LAYOUT: &'static [FieldKind] = &[FieldKind::U32, FieldKind::U32];

    fn from_fields(fields: &[u32]) -> Self {
        Self {
            r_offset: fields[0],
            r_info: fields[1],
        }
    }

    fn to_fields(&self) -> Vec<u32> {
        vec![self.r_offset, self.r_info]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::record_size;

    fn ident_bytes(class: u8, data: u8) -> [u8; EI_NIDENT] {
        let mut bytes = [0u8; EI_NIDENT];
        bytes[..4].copy_from_slice(&ELF_MAGIC);
        bytes[4] = class;
        bytes[5] = data;
        bytes[6] = 1; // EI_VERSION
        bytes
    }

    #[test]
    fn test_ident_parse_32bit_little() {
        let ident = Ident::parse(&ident_bytes(1, 1)).unwrap();
        assert_eq!(ident.class, Class::Elf32);
        assert_eq!(ident.encoding, Encoding::Little);
    }

    #[test]
    fn test_ident_parse_32bit_big() {
        let ident = Ident::parse(&ident_bytes(1, 2)).unwrap();
        assert_eq!(ident.encoding, Encoding::Big);
    }

    #[test]
    fn test_ident_rejects_bad_magic() {
        let mut bytes = ident_bytes(1, 1);
        bytes[0] = 0x7e;
        assert!(matches!(
            Ident::parse(&bytes),
            Err(ElfError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_ident_rejects_64bit() {
        assert!(matches!(
            Ident::parse(&ident_bytes(2, 1)),
            Err(ElfError::UnsupportedFormat {
                what: "class",
                value: 2,
            })
        ));
    }

    #[test]
    fn test_ident_rejects_unknown_encoding() {
        assert!(matches!(
            Ident::parse(&ident_bytes(1, 0)),
            Err(ElfError::UnsupportedFormat {
                what: "data encoding",
                ..
            })
        ));
    }

    #[test]
    fn test_record_sizes_match_elf32() {
        // e_ident excluded from Ehdr32, so 52 - 16
        assert_eq!(record_size::<Ehdr32>(), 36);
        assert_eq!(record_size::<Shdr32>(), 40);
        assert_eq!(record_size::<Rel32>(), 8);
    }

    #[test]
    fn test_rel_info_split() {
        let mut rel = Rel32 {
            r_offset: 0x1000,
            r_info: 0x0000_0105,
        };
        assert_eq!(rel.reloc_type(), 0x05);
        assert_eq!(rel.symbol_index(), 0x1);
        rel.clear_symbol_index();
        assert_eq!(rel.r_info, 0x05);
        assert_eq!(rel.symbol_index(), 0);
    }
}
