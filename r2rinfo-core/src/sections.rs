use std::fmt;

/// Identifier of one entry in the ReadyToRun section directory.
///
/// The named variants are the closed set of codes the format defines.
/// Any other wire value is legal and carried verbatim as
/// [`SectionKind::Unknown`], so the directory entry is never dropped
/// and the raw code survives for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    CompilerIdentifier,        // 100
    ImportSections,            // 101
    RuntimeFunctions,          // 102
    MethodDefEntryPoints,      // 103
    ExceptionInfo,             // 104
    DebugInfo,                 // 105
    DelayLoadMethodCallThunks, // 106
    // 107 belonged to an older encoding of the available-types table
    AvailableTypes,            // 108
    InstanceMethodEntryPoints, // 109
    InliningInfo,              // 110
    ProfileDataInfo,           // 111
    ManifestMetadata,          // 112
    AttributePresence,         // 113
    InliningInfo2,             // 114
    ComponentAssemblies,       // 115
    OwnerCompositeExecutable,  // 116
    PgoInstrumentationData,    // 117
    ManifestAssemblyMvids,     // 118
    Unknown(i32),
}

impl SectionKind {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            100 => SectionKind::CompilerIdentifier,
            101 => SectionKind::ImportSections,
            102 => SectionKind::RuntimeFunctions,
            103 => SectionKind::MethodDefEntryPoints,
            104 => SectionKind::ExceptionInfo,
            105 => SectionKind::DebugInfo,
            106 => SectionKind::DelayLoadMethodCallThunks,
            108 => SectionKind::AvailableTypes,
            109 => SectionKind::InstanceMethodEntryPoints,
            110 => SectionKind::InliningInfo,
            111 => SectionKind::ProfileDataInfo,
            112 => SectionKind::ManifestMetadata,
            113 => SectionKind::AttributePresence,
            114 => SectionKind::InliningInfo2,
            115 => SectionKind::ComponentAssemblies,
            116 => SectionKind::OwnerCompositeExecutable,
            117 => SectionKind::PgoInstrumentationData,
            118 => SectionKind::ManifestAssemblyMvids,
            other => SectionKind::Unknown(other),
        }
    }

    /// Wire value of this section type.
    pub fn code(&self) -> i32 {
        match self {
            SectionKind::CompilerIdentifier => 100,
            SectionKind::ImportSections => 101,
            SectionKind::RuntimeFunctions => 102,
            SectionKind::MethodDefEntryPoints => 103,
            SectionKind::ExceptionInfo => 104,
            SectionKind::DebugInfo => 105,
            SectionKind::DelayLoadMethodCallThunks => 106,
            SectionKind::AvailableTypes => 108,
            SectionKind::InstanceMethodEntryPoints => 109,
            SectionKind::InliningInfo => 110,
            SectionKind::ProfileDataInfo => 111,
            SectionKind::ManifestMetadata => 112,
            SectionKind::AttributePresence => 113,
            SectionKind::InliningInfo2 => 114,
            SectionKind::ComponentAssemblies => 115,
            SectionKind::OwnerCompositeExecutable => 116,
            SectionKind::PgoInstrumentationData => 117,
            SectionKind::ManifestAssemblyMvids => 118,
            SectionKind::Unknown(raw) => *raw,
        }
    }

    /// True when the code is outside the format's known set.
    pub fn is_unknown(&self) -> bool {
        matches!(self, SectionKind::Unknown(_))
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::Unknown(raw) => write!(f, "Unknown({raw})"),
            known => write!(f, "{known:?}"),
        }
    }
}

/// One decoded section directory entry: where a category of
/// precompiled data lives in the image and how large it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub rva: i32,
    pub size: i32,
}
