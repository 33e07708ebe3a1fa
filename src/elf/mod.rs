//! ELF structural parsing and in-place relocation editing

mod editor;
mod types;

pub use editor::clear_symbol_references;
pub use editor::ElfParser;
pub use editor::RelocationTable;
pub use editor::SectionTable;
pub use types::Class;
pub use types::Ehdr32;
pub use types::Ident;
pub use types::Rel32;
pub use types::Shdr32;
pub use types::ELF_MAGIC;
pub use types::EI_NIDENT;
pub use types::SHT_REL;
pub use types::SHT_RELA;
