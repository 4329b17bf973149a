use rowan::TextRange;

/// Kinds of problems reported while assembling.
///
/// Encoding problems come first, then label resolution problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    // Line structure
    UnknownOpcode,
    UnsupportedDirective,
    OperandCount,
    InvalidOperand,

    // Operand values
    NegativeUnsigned,
    ValueTruncated,
    FloatTruncated,
    LabelFieldTooNarrow,
    LabelFieldTooWide,
    LabelNotAllowed,
    EncodingFailed,

    // Label resolution
    DuplicateLabel,
    UndefinedLabel,
    TargetTooFar,
}

impl DiagnosticKind {
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ValueTruncated | Self::FloatTruncated => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Whether this kind is produced by the relocation pass.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateLabel | Self::UndefinedLabel | Self::TargetTooFar
        )
    }

    /// Base message for this diagnostic kind, used when no custom message is provided.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::UnknownOpcode => "unknown opcode",
            Self::UnsupportedDirective => "unsupported directive",
            Self::OperandCount => "wrong number of operands",
            Self::InvalidOperand => "invalid operand",

            Self::NegativeUnsigned => "negative value in unsigned field",
            Self::ValueTruncated => "possible loss of data",
            Self::FloatTruncated => "float value truncated to integer",
            Self::LabelFieldTooNarrow => "not enough bytes for a code label reference",
            Self::LabelFieldTooWide => "too many bytes for a code label reference",
            Self::LabelNotAllowed => "label not allowed here",
            Self::EncodingFailed => "cannot encode instruction",

            Self::DuplicateLabel => "duplicate label",
            Self::UndefinedLabel => "undefined label",
            Self::TargetTooFar => "jump target too far",
        }
    }

    /// Template for custom messages. Contains `{}` placeholder for caller-provided detail.
    pub fn custom_message(&self) -> String {
        match self {
            Self::UnknownOpcode => "unknown opcode `{}`".to_string(),
            Self::UnsupportedDirective => "directive `{}` is not supported here".to_string(),
            Self::NegativeUnsigned => "found negative integer {}, expected unsigned integer".to_string(),
            Self::ValueTruncated => "possible loss of data, {}".to_string(),
            Self::DuplicateLabel => "label `{}` is already defined".to_string(),
            Self::UndefinedLabel => "label `{}` is not defined".to_string(),
            Self::TargetTooFar => "jump target `{}` is out of 16-bit range".to_string(),
            _ => format!("{}: {{}}", self.fallback_message()),
        }
    }

    /// Render the final message.
    ///
    /// - `None` → returns `fallback_message()`
    /// - `Some(detail)` → returns `custom_message()` with `{}` replaced by detail
    pub fn message(&self, msg: Option<&str>) -> String {
        match msg {
            None => self.fallback_message().to_string(),
            Some(detail) => self.custom_message().replace("{}", detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub(crate) range: TextRange,
    pub(crate) message: String,
}

impl RelatedInfo {
    pub fn new(range: TextRange, message: impl Into<String>) -> Self {
        Self {
            range,
            message: message.into(),
        }
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub(crate) kind: DiagnosticKind,
    /// The range shown to the user (underlined in output).
    pub(crate) range: TextRange,
    pub(crate) message: String,
    pub(crate) related: Vec<RelatedInfo>,
}

impl DiagnosticMessage {
    pub(crate) fn new(kind: DiagnosticKind, range: TextRange, message: impl Into<String>) -> Self {
        Self {
            kind,
            range,
            message: message.into(),
            related: Vec::new(),
        }
    }

    pub(crate) fn with_default_message(kind: DiagnosticKind, range: TextRange) -> Self {
        Self::new(kind, range, kind.fallback_message())
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.kind.default_severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.severity(),
            u32::from(self.range.start()),
            u32::from(self.range.end()),
            self.message
        )?;
        for related in &self.related {
            write!(
                f,
                " (related: {} at {}..{})",
                related.message,
                u32::from(related.range.start()),
                u32::from(related.range.end())
            )?;
        }
        Ok(())
    }
}
