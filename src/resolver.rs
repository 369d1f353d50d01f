use std::sync::LazyLock;

use regex::Regex;

use crate::Tag;

/// Picks the tag of a scalar that carries none in the source.
///
/// `implicit` is false for quoted and block scalars, whose tag is `!!str`
/// under every profile here.
pub trait ScalarResolver: Send + Sync {
    fn resolve(&self, value: &str, implicit: bool) -> Tag;
}

/// Every scalar is a string.
#[derive(Copy, Clone, Debug, Default)]
pub struct FailsafeResolver;

impl ScalarResolver for FailsafeResolver {
    fn resolve(&self, _value: &str, _implicit: bool) -> Tag {
        Tag::STR
    }
}

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("scalar resolution patterns are valid")
}

static JSON_NULL: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:null|)$"));
static JSON_BOOL: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:true|false)$"));
static JSON_INT: LazyLock<Regex> = LazyLock::new(|| pattern(r"^-?(?:0|[1-9][0-9]*)$"));
static JSON_FLOAT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^-?(?:0|[1-9][0-9]*)(?:\.[0-9]*)?(?:[eE][-+]?[0-9]+)?$"));

/// The JSON schema: only JSON spellings of null, booleans and numbers.
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonResolver;

impl ScalarResolver for JsonResolver {
    fn resolve(&self, value: &str, implicit: bool) -> Tag {
        if !implicit {
            Tag::STR
        } else if JSON_NULL.is_match(value) {
            Tag::NULL
        } else if JSON_BOOL.is_match(value) {
            Tag::BOOL
        } else if JSON_INT.is_match(value) {
            Tag::INT
        } else if JSON_FLOAT.is_match(value) {
            Tag::FLOAT
        } else {
            Tag::STR
        }
    }
}

static CORE_NULL: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:~|null|Null|NULL|)$"));
static CORE_BOOL: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^(?:true|True|TRUE|false|False|FALSE)$"));
static CORE_INT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^(?:[-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$"));
static CORE_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    pattern(
        r"^(?:[-+]?(?:\.[0-9]+|[0-9]+(?:\.[0-9]*)?)(?:[eE][-+]?[0-9]+)?|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
    )
});

/// The YAML 1.2 core schema.
#[derive(Copy, Clone, Debug, Default)]
pub struct CoreResolver;

impl ScalarResolver for CoreResolver {
    fn resolve(&self, value: &str, implicit: bool) -> Tag {
        if !implicit {
            Tag::STR
        } else if CORE_NULL.is_match(value) {
            Tag::NULL
        } else if CORE_BOOL.is_match(value) {
            Tag::BOOL
        } else if CORE_INT.is_match(value) {
            Tag::INT
        } else if CORE_FLOAT.is_match(value) {
            Tag::FLOAT
        } else {
            Tag::STR
        }
    }
}
