use crate::header::{LogSink, ReadyToRunHeader};
use anyhow::{bail, Context, Result};
use byteorder::{ReadBytesExt, LE};
use goblin::pe::PE;
use std::io::{Cursor, Seek, SeekFrom};

/// Byte offset of the ManagedNativeHeader data directory inside the
/// COR20 (CLR runtime) header.
const COR20_MANAGED_NATIVE_HEADER: u64 = 64;

/// A PE file whose ReadyToRun header has been located and decoded.
pub struct NativeImage {
    pub path: String,
    pub header: ReadyToRunHeader,
}

impl NativeImage {
    /// Opens a .NET PE image, follows the CLR runtime header to the
    /// ManagedNativeHeader directory, and decodes the ReadyToRun
    /// header it points at.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let buf = std::fs::read(&path)
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        let pe = PE::parse(&buf)?;

        let Some(optional_header) = pe.header.optional_header else {
            bail!("PE has no optional header");
        };
        let Some(clr_dir) = optional_header.data_directories.get_clr_runtime_header() else {
            bail!("no CLR runtime header directory; not a .NET image");
        };

        let cor20_offset = rva_to_offset(&pe, clr_dir.virtual_address)?;
        let mut cursor = Cursor::new(buf.as_slice());
        cursor.seek(SeekFrom::Start(cor20_offset + COR20_MANAGED_NATIVE_HEADER))?;
        let native_rva = cursor.read_u32::<LE>()?;
        let native_size = cursor.read_u32::<LE>()?;
        if native_rva == 0 || native_size == 0 {
            bail!("image has no ManagedNativeHeader; not compiled ReadyToRun");
        }
        log::info!("ManagedNativeHeader at rva {native_rva:#x} ({native_size} bytes)");

        let offset = rva_to_offset(&pe, native_rva)?;
        let header = ReadyToRunHeader::decode(&buf, native_rva, offset as usize, &mut LogSink)?;

        Ok(Self {
            path: path.as_ref().display().to_string(),
            header,
        })
    }
}

/// Translates an RVA to a file offset through the PE section table.
fn rva_to_offset(pe: &PE, rva: u32) -> Result<u64> {
    for section in &pe.sections {
        let start = section.virtual_address;
        let span = section.virtual_size.max(section.size_of_raw_data);
        if rva >= start && rva - start < span {
            return Ok(u64::from(rva - start + section.pointer_to_raw_data));
        }
    }
    bail!("rva {rva:#x} is not mapped by any section")
}
