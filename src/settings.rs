use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::{
    AnchorGenerator, Break, CoreResolver, NumberAnchorGenerator, ScalarResolver, ScalarStyle, Tag,
    TagDirective, VersionDirective,
};

/// Decides whether a `%YAML` directive is acceptable.
///
/// Returning `Err` rejects the document with the given message.
pub type VersionFunction =
    Arc<dyn Fn(VersionDirective) -> Result<VersionDirective, String> + Send + Sync>;

/// Builds a fresh anchor generator for every serialized stream.
pub type AnchorGeneratorFactory = Arc<dyn Fn() -> Box<dyn AnchorGenerator> + Send + Sync>;

/// Accepts every 1.x version and rejects the rest.
pub fn default_version_function() -> VersionFunction {
    Arc::new(|version: VersionDirective| {
        if version.major == 1 {
            if version.minor != 2 {
                tracing::warn!(%version, "document declares a YAML version other than 1.2");
            }
            Ok(version)
        } else {
            Err(format!("unsupported YAML version {version}"))
        }
    })
}

/// Options for reading YAML: reader, scanner, parser and composer.
#[derive(Clone)]
pub struct LoadSettings {
    pub(crate) label: String,
    pub(crate) code_point_limit: usize,
    pub(crate) buffer_size: usize,
    pub(crate) max_simple_key_length: usize,
    pub(crate) allow_recursive_keys: bool,
    pub(crate) allow_duplicate_keys: bool,
    pub(crate) parse_comments: bool,
    pub(crate) version_function: VersionFunction,
    pub(crate) scalar_resolver: Arc<dyn ScalarResolver>,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            label: String::from("reader"),
            code_point_limit: 3 * 1024 * 1024,
            buffer_size: crate::INPUT_BUFFER_SIZE,
            max_simple_key_length: 1024,
            allow_recursive_keys: false,
            allow_duplicate_keys: true,
            parse_comments: false,
            version_function: default_version_function(),
            scalar_resolver: Arc::new(CoreResolver),
        }
    }
}

impl LoadSettings {
    /// Name of the input used in error messages.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Maximum number of code points in a single document.
    #[must_use]
    pub fn with_code_point_limit(mut self, limit: usize) -> Self {
        self.code_point_limit = limit;
        self
    }

    /// Capacity of the buffer placed in front of `Read` inputs.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(16);
        self
    }

    /// How far (in code points) an implicit key may extend before its `:`.
    #[must_use]
    pub fn with_max_simple_key_length(mut self, length: usize) -> Self {
        self.max_simple_key_length = length;
        self
    }

    #[must_use]
    pub fn with_allow_recursive_keys(mut self, allow: bool) -> Self {
        self.allow_recursive_keys = allow;
        self
    }

    #[must_use]
    pub fn with_allow_duplicate_keys(mut self, allow: bool) -> Self {
        self.allow_duplicate_keys = allow;
        self
    }

    /// Keep comments as tokens, events and node annotations.
    #[must_use]
    pub fn with_parse_comments(mut self, parse: bool) -> Self {
        self.parse_comments = parse;
        self
    }

    #[must_use]
    pub fn with_version_function(mut self, function: VersionFunction) -> Self {
        self.version_function = function;
        self
    }

    #[must_use]
    pub fn with_scalar_resolver(mut self, resolver: Arc<dyn ScalarResolver>) -> Self {
        self.scalar_resolver = resolver;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn code_point_limit(&self) -> usize {
        self.code_point_limit
    }

    pub fn scalar_resolver(&self) -> &dyn ScalarResolver {
        &*self.scalar_resolver
    }
}

impl core::fmt::Debug for LoadSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoadSettings")
            .field("label", &self.label)
            .field("code_point_limit", &self.code_point_limit)
            .field("buffer_size", &self.buffer_size)
            .field("max_simple_key_length", &self.max_simple_key_length)
            .field("allow_recursive_keys", &self.allow_recursive_keys)
            .field("allow_duplicate_keys", &self.allow_duplicate_keys)
            .field("parse_comments", &self.parse_comments)
            .finish_non_exhaustive()
    }
}

/// Collection style applied to nodes that do not request one.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum FlowStyle {
    /// Block collections, except empty ones which are written in flow style.
    #[default]
    Auto,
    Block,
    Flow,
}

/// What to do with a string containing characters that cannot be written
/// literally.
///
/// Printable non-ASCII text is a separate matter: it is passed through
/// unescaped when [`DumpSettings::with_unicode`] is `true` and escaped
/// otherwise, whichever variant is chosen here.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum NonPrintableStyle {
    /// Write a double-quoted scalar with escape sequences.
    #[default]
    Escape,
    /// Write the UTF-8 bytes as a base64 `!!binary` scalar.
    Binary,
    /// Refuse to emit the scalar.
    Fail,
}

/// Options for writing YAML: serializer and emitter.
#[derive(Clone)]
pub struct DumpSettings {
    pub(crate) explicit_start: bool,
    pub(crate) explicit_end: bool,
    pub(crate) explicit_root_tag: Option<Tag>,
    pub(crate) version_directive: Option<VersionDirective>,
    pub(crate) tag_directives: Vec<TagDirective>,
    pub(crate) canonical: bool,
    pub(crate) multi_line_flow: bool,
    pub(crate) default_flow_style: FlowStyle,
    pub(crate) default_scalar_style: ScalarStyle,
    pub(crate) indent: usize,
    pub(crate) indicator_indent: usize,
    pub(crate) indent_with_indicator: bool,
    pub(crate) width: usize,
    pub(crate) split_lines: bool,
    pub(crate) line_break: Break,
    pub(crate) unicode: bool,
    pub(crate) non_printable_style: NonPrintableStyle,
    pub(crate) dump_comments: bool,
    pub(crate) anchor_generator: AnchorGeneratorFactory,
    pub(crate) scalar_resolver: Arc<dyn ScalarResolver>,
}

impl Default for DumpSettings {
    fn default() -> Self {
        Self {
            explicit_start: false,
            explicit_end: false,
            explicit_root_tag: None,
            version_directive: None,
            tag_directives: Vec::new(),
            canonical: false,
            multi_line_flow: false,
            default_flow_style: FlowStyle::Auto,
            default_scalar_style: ScalarStyle::Any,
            indent: 2,
            indicator_indent: 0,
            indent_with_indicator: false,
            width: 80,
            split_lines: true,
            line_break: Break::Ln,
            unicode: true,
            non_printable_style: NonPrintableStyle::Escape,
            dump_comments: false,
            anchor_generator: Arc::new(|| {
                Box::new(NumberAnchorGenerator::default()) as Box<dyn AnchorGenerator>
            }),
            scalar_resolver: Arc::new(CoreResolver),
        }
    }
}

impl DumpSettings {
    /// Always write `---` before each document.
    #[must_use]
    pub fn with_explicit_start(mut self, explicit: bool) -> Self {
        self.explicit_start = explicit;
        self
    }

    /// Always write `...` after each document.
    #[must_use]
    pub fn with_explicit_end(mut self, explicit: bool) -> Self {
        self.explicit_end = explicit;
        self
    }

    /// Replace the tag of every root node and force it to be written.
    #[must_use]
    pub fn with_explicit_root_tag(mut self, tag: Option<Tag>) -> Self {
        self.explicit_root_tag = tag;
        self
    }

    #[must_use]
    pub fn with_version_directive(mut self, version: Option<VersionDirective>) -> Self {
        self.version_directive = version;
        self
    }

    #[must_use]
    pub fn with_tag_directives(mut self, directives: Vec<TagDirective>) -> Self {
        self.tag_directives = directives;
        self
    }

    #[must_use]
    pub fn with_canonical(mut self, canonical: bool) -> Self {
        self.canonical = canonical;
        self
    }

    /// Put every entry of a flow collection on its own line.
    #[must_use]
    pub fn with_multi_line_flow(mut self, multi_line: bool) -> Self {
        self.multi_line_flow = multi_line;
        self
    }

    #[must_use]
    pub fn with_default_flow_style(mut self, style: FlowStyle) -> Self {
        self.default_flow_style = style;
        self
    }

    #[must_use]
    pub fn with_default_scalar_style(mut self, style: ScalarStyle) -> Self {
        self.default_scalar_style = style;
        self
    }

    /// Spaces per nesting level, between 1 and 9.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent.clamp(1, 9);
        self
    }

    /// Spaces written before a block sequence `-`. Kept below the indent.
    #[must_use]
    pub fn with_indicator_indent(mut self, indent: usize) -> Self {
        self.indicator_indent = indent.min(9);
        self
    }

    /// Indent sequence entries by the indent plus the indicator indent.
    #[must_use]
    pub fn with_indent_with_indicator(mut self, with_indicator: bool) -> Self {
        self.indent_with_indicator = with_indicator;
        self
    }

    /// Preferred line width.
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Allow long scalars to be folded over several lines.
    #[must_use]
    pub fn with_split_lines(mut self, split: bool) -> Self {
        self.split_lines = split;
        self
    }

    #[must_use]
    pub fn with_line_break(mut self, line_break: Break) -> Self {
        self.line_break = line_break;
        self
    }

    /// Write non-ASCII characters as they are instead of escaping them.
    #[must_use]
    pub fn with_unicode(mut self, unicode: bool) -> Self {
        self.unicode = unicode;
        self
    }

    #[must_use]
    pub fn with_non_printable_style(mut self, style: NonPrintableStyle) -> Self {
        self.non_printable_style = style;
        self
    }

    #[must_use]
    pub fn with_dump_comments(mut self, dump: bool) -> Self {
        self.dump_comments = dump;
        self
    }

    #[must_use]
    pub fn with_anchor_generator(mut self, factory: AnchorGeneratorFactory) -> Self {
        self.anchor_generator = factory;
        self
    }

    #[must_use]
    pub fn with_scalar_resolver(mut self, resolver: Arc<dyn ScalarResolver>) -> Self {
        self.scalar_resolver = resolver;
        self
    }

    pub fn scalar_resolver(&self) -> &dyn ScalarResolver {
        &*self.scalar_resolver
    }

    pub(crate) fn best_indent(&self) -> usize {
        self.indent
    }

    /// Spaces before a block sequence `-`. Unless the entries are shifted
    /// by the indicator indent, the dash and its space must fit inside the
    /// indent.
    pub(crate) fn best_indicator_indent(&self) -> usize {
        if self.indent_with_indicator {
            self.indicator_indent
        } else {
            self.indicator_indent.min(self.indent.saturating_sub(2))
        }
    }

    pub(crate) fn best_width(&self) -> usize {
        if self.width <= self.indent * 2 {
            80
        } else {
            self.width
        }
    }
}

impl core::fmt::Debug for DumpSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DumpSettings")
            .field("explicit_start", &self.explicit_start)
            .field("explicit_end", &self.explicit_end)
            .field("explicit_root_tag", &self.explicit_root_tag)
            .field("version_directive", &self.version_directive)
            .field("tag_directives", &self.tag_directives)
            .field("canonical", &self.canonical)
            .field("default_flow_style", &self.default_flow_style)
            .field("default_scalar_style", &self.default_scalar_style)
            .field("indent", &self.indent)
            .field("indicator_indent", &self.indicator_indent)
            .field("width", &self.width)
            .field("unicode", &self.unicode)
            .field("non_printable_style", &self.non_printable_style)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_version_function() {
        let settings = LoadSettings::default();
        let accept = &settings.version_function;
        assert!(accept(VersionDirective::new(1, 1)).is_ok());
        assert!(accept(VersionDirective::new(1, 2)).is_ok());
        assert_eq!(
            accept(VersionDirective::new(2, 0)).unwrap_err(),
            "unsupported YAML version 2.0"
        );
    }

    #[test]
    fn indicator_indent_stays_below_indent() {
        let settings = DumpSettings::default()
            .with_indent(2)
            .with_indicator_indent(4);
        assert_eq!(settings.best_indicator_indent(), 0);
        let settings = settings.with_indent(4);
        assert_eq!(settings.best_indicator_indent(), 2);
        let settings = settings.with_indent_with_indicator(true);
        assert_eq!(settings.best_indicator_indent(), 4);
        let settings = DumpSettings::default().with_indent(0);
        assert_eq!(settings.best_indent(), 1);
    }
}
