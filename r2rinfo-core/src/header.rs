use crate::error::FormatError;
use crate::reader::ImageReader;
use crate::sections::{Section, SectionKind};
use bitflags::bitflags;
use std::collections::HashMap;
use std::fmt;

/// Little-endian magic at the start of every ReadyToRun header ("RTR\0").
pub const READYTORUN_SIGNATURE: u32 = 0x0052_5452;

bitflags! {
    /// Format-level flags from the header's bitfield.
    ///
    /// Bits outside the named set are retained
    /// (`from_bits_retain`) and show up in the raw flags word, but get
    /// no individual line in the report.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReadyToRunFlags: u32 {
        const PLATFORM_NEUTRAL_SOURCE = 0x0000_0001;
        const SKIP_TYPE_VALIDATION = 0x0000_0002;
    }
}

/// Sink for recoverable decode diagnostics, such as a section type
/// code outside the known set.
pub trait WarningSink {
    fn emit(&mut self, message: &str);
}

/// Forwards decode warnings to the `log` crate.
pub struct LogSink;

impl WarningSink for LogSink {
    fn emit(&mut self, message: &str) {
        log::warn!("{message}");
    }
}

/// The ReadyToRun header of a native image: signature, format version,
/// flag bitfield, and the directory of sections holding the image's
/// precompiled data.
///
/// Built once by [`ReadyToRunHeader::decode`] and immutable afterwards.
/// It holds no reference to the buffer it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyToRunHeader {
    /// RVA the header lives at, recorded verbatim from the caller.
    pub rva: u32,
    /// Bytes the header occupies in the image, section table included.
    pub size: u32,
    pub signature: u32,
    /// The signature bytes as text, kept for display even when they
    /// are not valid UTF-8.
    pub signature_text: String,
    pub major_version: u16,
    pub minor_version: u16,
    pub flags: ReadyToRunFlags,
    /// Section directory. A duplicate type code later in the table
    /// replaces the earlier entry.
    pub sections: HashMap<SectionKind, Section>,
}

impl ReadyToRunHeader {
    /// Decodes the header found at `offset` within `image`.
    ///
    /// `rva` is opaque caller metadata and is only recorded. The read
    /// is strictly sequential; the first field that cannot be read in
    /// full aborts the decode with [`FormatError::TruncatedInput`] and
    /// no partial header is ever returned. Unrecognized section type
    /// codes are reported through `warnings` and kept as
    /// [`SectionKind::Unknown`] entries.
    pub fn decode(
        image: &[u8],
        rva: u32,
        offset: usize,
        warnings: &mut dyn WarningSink,
    ) -> Result<Self, FormatError> {
        let mut reader = ImageReader::new(image, offset);
        let start = reader.pos();

        let signature = reader.read_u32()?;
        let signature_text = String::from_utf8_lossy(&signature.to_le_bytes()).into_owned();
        if signature != READYTORUN_SIGNATURE {
            return Err(FormatError::InvalidSignature {
                offset: start,
                found: signature,
            });
        }

        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        let flags = ReadyToRunFlags::from_bits_retain(reader.read_u32()?);

        let count_offset = reader.pos();
        let section_count = reader.read_i32()?;
        if section_count < 0 {
            return Err(FormatError::InvalidSectionCount {
                offset: count_offset,
                count: section_count,
            });
        }

        let mut sections = HashMap::new();
        for index in 0..section_count {
            let raw = reader.read_i32()?;
            let section_rva = reader.read_i32()?;
            let section_size = reader.read_i32()?;

            let kind = SectionKind::from_raw(raw);
            if kind.is_unknown() {
                warnings.emit(&format!(
                    "unrecognized section type {raw} at table index {index}"
                ));
            }
            sections.insert(
                kind,
                Section {
                    kind,
                    rva: section_rva,
                    size: section_size,
                },
            );
        }

        Ok(Self {
            rva,
            size: (reader.pos() - start) as u32,
            signature,
            signature_text,
            major_version,
            minor_version,
            flags,
            sections,
        })
    }
}

impl fmt::Display for ReadyToRunHeader {
    /// Multi-line report over the decoded fields. Version, size and
    /// flag lines only make sense for a genuine header, so everything
    /// past the RVA line is gated on the signature.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Signature: {:#010x} ({})", self.signature, self.signature_text)?;
        writeln!(f, "RelativeVirtualAddress: {:#010x}", self.rva)?;
        if self.signature == READYTORUN_SIGNATURE {
            writeln!(f, "Size: {}", self.size)?;
            writeln!(f, "MajorVersion: {:#06x}", self.major_version)?;
            writeln!(f, "MinorVersion: {:#06x}", self.minor_version)?;
            writeln!(f, "Flags: {:#010x}", self.flags.bits())?;
            for (name, _) in self.flags.iter_names() {
                writeln!(f, "  {name}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{WriteBytesExt, LE};

    #[derive(Default)]
    struct CollectSink(Vec<String>);

    impl WarningSink for CollectSink {
        fn emit(&mut self, message: &str) {
            self.0.push(message.to_string());
        }
    }

    fn encode(major: u16, minor: u16, flags: u32, entries: &[(i32, i32, i32)]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LE>(READYTORUN_SIGNATURE).unwrap();
        buf.write_u16::<LE>(major).unwrap();
        buf.write_u16::<LE>(minor).unwrap();
        buf.write_u32::<LE>(flags).unwrap();
        buf.write_i32::<LE>(entries.len() as i32).unwrap();
        for &(ty, rva, size) in entries {
            buf.write_i32::<LE>(ty).unwrap();
            buf.write_i32::<LE>(rva).unwrap();
            buf.write_i32::<LE>(size).unwrap();
        }
        buf
    }

    fn decode_ok(buf: &[u8]) -> ReadyToRunHeader {
        let mut sink = CollectSink::default();
        ReadyToRunHeader::decode(buf, 0x5000, 0, &mut sink).unwrap()
    }

    #[test]
    fn empty_section_table() {
        let hdr = decode_ok(&encode(3, 1, 0, &[]));
        assert_eq!(hdr.size, 16);
        assert!(hdr.sections.is_empty());
        assert_eq!(hdr.signature, READYTORUN_SIGNATURE);
        assert_eq!(hdr.signature_text, "RTR\0");
        assert_eq!(hdr.rva, 0x5000);
    }

    #[test]
    fn fixed_header_truncated() {
        let buf = encode(3, 1, 0, &[]);
        for len in 0..16 {
            let mut sink = CollectSink::default();
            let err = ReadyToRunHeader::decode(&buf[..len], 0, 0, &mut sink).unwrap_err();
            assert!(
                matches!(err, FormatError::TruncatedInput { .. }),
                "len {len}: {err}"
            );
        }
    }

    #[test]
    fn section_table_truncated() {
        let buf = encode(3, 1, 0, &[(100, 0x2000, 0x100), (102, 0x3000, 0x40)]);
        assert_eq!(buf.len(), 16 + 2 * 12);
        for len in 16..buf.len() {
            let mut sink = CollectSink::default();
            let err = ReadyToRunHeader::decode(&buf[..len], 0, 0, &mut sink).unwrap_err();
            assert!(
                matches!(err, FormatError::TruncatedInput { .. }),
                "len {len}: {err}"
            );
        }
        assert_eq!(decode_ok(&buf).sections.len(), 2);
    }

    #[test]
    fn signature_mutation_rejected() {
        for byte in 0..4 {
            let mut buf = encode(3, 1, 0, &[]);
            buf[byte] ^= 0xff;
            let mut sink = CollectSink::default();
            match ReadyToRunHeader::decode(&buf, 0, 0, &mut sink).unwrap_err() {
                FormatError::InvalidSignature { offset, found } => {
                    assert_eq!(offset, 0);
                    assert_ne!(found, READYTORUN_SIGNATURE);
                }
                other => panic!("expected InvalidSignature, got {other}"),
            }
        }
    }

    #[test]
    fn negative_section_count() {
        let mut buf = encode(3, 1, 0, &[]);
        buf[12..16].copy_from_slice(&(-1i32).to_le_bytes());
        let mut sink = CollectSink::default();
        let err = ReadyToRunHeader::decode(&buf, 0, 0, &mut sink).unwrap_err();
        assert_eq!(err, FormatError::InvalidSectionCount { offset: 12, count: -1 });
    }

    #[test]
    fn duplicate_kind_keeps_later_entry() {
        let hdr = decode_ok(&encode(5, 4, 0, &[(101, 0x1000, 0x10), (101, 0x9000, 0x90)]));
        assert_eq!(hdr.sections.len(), 1);
        let s = hdr.sections[&SectionKind::ImportSections];
        assert_eq!(s.rva, 0x9000);
        assert_eq!(s.size, 0x90);
        // both entries were still consumed
        assert_eq!(hdr.size, 16 + 2 * 12);
    }

    #[test]
    fn unknown_kind_warns_and_is_kept() {
        let buf = encode(5, 4, 0, &[(2, 0x2000, 0x100), (100, 0x3000, 0x10)]);
        let mut sink = CollectSink::default();
        let hdr = ReadyToRunHeader::decode(&buf, 0, 0, &mut sink).unwrap();
        assert_eq!(sink.0.len(), 1);
        assert!(sink.0[0].contains("section type 2"), "{}", sink.0[0]);
        assert_eq!(hdr.sections.len(), 2);
        assert_eq!(hdr.sections[&SectionKind::Unknown(2)].rva, 0x2000);
    }

    #[test]
    fn decode_at_nonzero_offset() {
        let mut buf = vec![0xcc; 7];
        buf.extend_from_slice(&encode(1, 0, 0, &[(100, 0, 4)]));
        let mut sink = CollectSink::default();
        let hdr = ReadyToRunHeader::decode(&buf, 0x4000, 7, &mut sink).unwrap();
        assert_eq!(hdr.rva, 0x4000);
        assert_eq!(hdr.size, 28);
        assert_eq!(hdr.sections[&SectionKind::CompilerIdentifier].size, 4);
    }

    #[test]
    fn round_trip_through_encoder() {
        // 0x8000 exercises retention of a bit with no name
        let original = decode_ok(&encode(6, 2, 0x8003, &[(100, 0x100, 8), (103, 0x4000, 0x200)]));
        let mut entries: Vec<_> = original
            .sections
            .values()
            .map(|s| (s.kind.code(), s.rva, s.size))
            .collect();
        entries.sort_by_key(|e| e.0);
        let again = decode_ok(&encode(
            original.major_version,
            original.minor_version,
            original.flags.bits(),
            &entries,
        ));
        assert_eq!(original, again);
    }

    #[test]
    fn flag_lines_follow_declaration_order() {
        let both = decode_ok(&encode(3, 1, 0x3, &[])).to_string();
        let neutral = both.find("PLATFORM_NEUTRAL_SOURCE").unwrap();
        let skip = both.find("SKIP_TYPE_VALIDATION").unwrap();
        assert!(neutral < skip);
        assert!(both.contains("\n  PLATFORM_NEUTRAL_SOURCE\n"));
        assert!(both.contains("\n  SKIP_TYPE_VALIDATION\n"));

        let none = decode_ok(&encode(3, 1, 0, &[])).to_string();
        assert!(!none.contains("PLATFORM_NEUTRAL_SOURCE"));
        assert!(!none.contains("SKIP_TYPE_VALIDATION"));
    }

    #[test]
    fn known_image_scenario() {
        let buf = encode(3, 1, 0x1, &[(2, 0x2000, 0x100)]);
        assert_eq!(&buf[..4], b"RTR\0");

        let mut sink = CollectSink::default();
        let hdr = ReadyToRunHeader::decode(&buf, 0x9000, 0, &mut sink).unwrap();
        assert_eq!(hdr.size, 28);
        let s = hdr.sections[&SectionKind::Unknown(2)];
        assert_eq!(s.rva, 0x2000);
        assert_eq!(s.size, 0x100);

        let report = hdr.to_string();
        assert!(report.starts_with("Signature: 0x00525452 (RTR\0)\n"), "{report}");
        assert!(report.contains("RelativeVirtualAddress: 0x00009000\n"));
        assert!(report.contains("Size: 28\n"));
        assert!(report.contains("MajorVersion: 0x0003\n"));
        assert!(report.contains("MinorVersion: 0x0001\n"));
        assert!(report.contains("Flags: 0x00000001\n"));
        assert!(report.contains("PLATFORM_NEUTRAL_SOURCE"));
        assert!(!report.contains("SKIP_TYPE_VALIDATION"));
    }
}
