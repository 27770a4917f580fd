//! Record size computation over the merged declarations of a tree.
//!
//! Field types are kept as text by the extractor (`char[64]`,
//! `void (*)(void *)`, `unsigned int : 3`, ...). The engine resolves that
//! text against scalar sizes of a [`DataModel`], typedef aliases and the
//! other records, applying natural alignment and tail padding.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::TypeAlias;
use crate::types::{RecordDecl, RecordKind, TypeRef};

const QUALIFIERS: &[&str] = &["const", "volatile", "restrict", "__restrict", "_Atomic"];

const BUILTIN_WORDS: &[&str] = &[
    "char", "short", "int", "long", "signed", "unsigned", "float", "double", "void", "_Bool",
    "bool",
];

/// Scalar size convention of the target ABI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataModel {
    /// 64-bit Unix: 8-byte `long` and pointers.
    #[default]
    Lp64,
    /// 64-bit Windows: 4-byte `long`, 8-byte pointers.
    Llp64,
    /// 32-bit targets.
    Ilp32,
}

impl DataModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataModel::Lp64 => "lp64",
            DataModel::Llp64 => "llp64",
            DataModel::Ilp32 => "ilp32",
        }
    }

    pub fn pointer_size(&self) -> u64 {
        match self {
            DataModel::Lp64 | DataModel::Llp64 => 8,
            DataModel::Ilp32 => 4,
        }
    }

    pub fn long_size(&self) -> u64 {
        match self {
            DataModel::Lp64 => 8,
            DataModel::Llp64 | DataModel::Ilp32 => 4,
        }
    }

    fn long_double(&self) -> Layout {
        match self {
            DataModel::Lp64 => Layout::new(16, 16),
            DataModel::Llp64 => Layout::new(8, 8),
            DataModel::Ilp32 => Layout::new(12, 4),
        }
    }
}

/// Size and alignment of a type, in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub size: u64,
    pub align: u64,
}

impl Layout {
    /// Contributes nothing to the enclosing record.
    pub const UNKNOWN: Layout = Layout { size: 0, align: 1 };

    pub fn new(size: u64, align: u64) -> Self {
        Self {
            size,
            align: align.max(1),
        }
    }

    fn scalar(size: u64) -> Self {
        Self::new(size, size)
    }
}

/// Return `records` with `size_in_bytes` filled in, nested inline records
/// included.
pub fn apply(records: &[RecordDecl], aliases: &[TypeAlias], model: DataModel) -> Vec<RecordDecl> {
    let mut engine = LayoutEngine::new(records, aliases, model);
    records.iter().map(|record| engine.sized(record)).collect()
}

/// Resolves type text to layouts. Named record layouts are cached.
pub struct LayoutEngine<'a> {
    model: DataModel,
    records: HashMap<&'a str, &'a RecordDecl>,
    aliases: HashMap<&'a str, &'a str>,
    cache: HashMap<String, Layout>,
    in_progress: HashSet<String>,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(records: &'a [RecordDecl], aliases: &'a [TypeAlias], model: DataModel) -> Self {
        Self {
            model,
            records: records
                .iter()
                .filter(|r| !r.name.is_empty())
                .map(|r| (r.name.as_str(), r))
                .collect(),
            aliases: aliases
                .iter()
                .map(|a| (a.name.as_str(), a.target.as_str()))
                .collect(),
            cache: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Copy of `record` with its size and the sizes of inline records set.
    pub fn sized(&mut self, record: &RecordDecl) -> RecordDecl {
        let mut out = record.clone();
        out.size_in_bytes = self.record_layout(record).size;
        for field in &mut out.fields {
            if let TypeRef::Record(inner) = &mut field.type_ref {
                let sized = self.sized(inner);
                **inner = sized;
            }
        }
        out
    }

    pub fn record_layout(&mut self, record: &RecordDecl) -> Layout {
        let named = !record.name.is_empty();
        if named && !self.in_progress.insert(record.name.clone()) {
            tracing::trace!(record = %record.name, "layout cycle, using size 0");
            return Layout::UNKNOWN;
        }

        let layout = match record.kind {
            RecordKind::Struct => self.struct_layout(record),
            RecordKind::Union => self.union_layout(record),
        };

        if named {
            self.in_progress.remove(&record.name);
        }
        layout
    }

    fn struct_layout(&mut self, record: &RecordDecl) -> Layout {
        let mut bits: u64 = 0;
        let mut align: u64 = 1;

        for field in &record.fields {
            if let Some((base, width)) = bitfield_of(&field.type_ref) {
                let unit = self.layout_of_type(base);
                let unit_bits = unit.size * 8;
                if unit_bits == 0 {
                    tracing::trace!(field = %field.name, "bitfield of unknown type");
                    continue;
                }
                if width == 0 {
                    bits = align_up(bits, unit_bits);
                    continue;
                }
                if bits / unit_bits != (bits + width - 1) / unit_bits {
                    bits = align_up(bits, unit_bits);
                }
                bits += width;
                align = align.max(unit.align);
                continue;
            }

            let layout = self.field_layout(&field.type_ref);
            bits = align_up(bits, layout.align * 8) + layout.size * 8;
            align = align.max(layout.align);
        }

        Layout::new(align_up(bits.div_ceil(8), align), align)
    }

    fn union_layout(&mut self, record: &RecordDecl) -> Layout {
        let mut size: u64 = 0;
        let mut align: u64 = 1;

        for field in &record.fields {
            let layout = match bitfield_of(&field.type_ref) {
                Some((base, width)) => {
                    let unit = self.layout_of_type(base);
                    Layout::new(width.div_ceil(8).min(unit.size), unit.align)
                }
                None => self.field_layout(&field.type_ref),
            };
            size = size.max(layout.size);
            align = align.max(layout.align);
        }

        Layout::new(align_up(size, align), align)
    }

    fn field_layout(&mut self, type_ref: &TypeRef) -> Layout {
        match type_ref {
            TypeRef::Primitive(text) => self.layout_of_type(text),
            TypeRef::Record(record) => self.record_layout(record),
        }
    }

    /// Layout of a type written as field type text.
    pub fn layout_of_type(&mut self, text: &str) -> Layout {
        let text = text.trim();

        if text.contains("(*") {
            return self.pointer();
        }

        if text.ends_with(']') {
            if let Some(open) = text.rfind('[') {
                let element = self.layout_of_type(&text[..open]);
                let dim = text[open + 1..text.len() - 1].trim();
                return match parse_dimension(dim) {
                    Some(count) => Layout::new(element.size * count, element.align),
                    None => {
                        tracing::trace!(dimension = dim, "array without literal dimension");
                        Layout::new(0, element.align)
                    }
                };
            }
        }

        if text.ends_with('*') {
            return self.pointer();
        }

        self.named_layout(text)
    }

    fn named_layout(&mut self, text: &str) -> Layout {
        let tokens: Vec<&str> = text
            .split_whitespace()
            .filter(|t| !QUALIFIERS.contains(t))
            .collect();

        match tokens.as_slice() {
            [] => Layout::UNKNOWN,
            ["enum", ..] => Layout::scalar(4),
            ["struct" | "union", name, ..] => self.record_by_name(name),
            _ if tokens.iter().all(|t| BUILTIN_WORDS.contains(t)) => self.builtin(&tokens),
            [name] => self.identifier_layout(name),
            _ => {
                tracing::trace!(ty = text, "unknown type");
                Layout::UNKNOWN
            }
        }
    }

    fn identifier_layout(&mut self, name: &str) -> Layout {
        if let Some(layout) = self.fixed_width(name) {
            return layout;
        }

        if let Some(target) = self.aliases.get(name).copied() {
            let key = format!("typedef {}", name);
            if !self.in_progress.insert(key.clone()) {
                tracing::trace!(alias = name, "typedef cycle, using size 0");
                return Layout::UNKNOWN;
            }
            let layout = self.layout_of_type(target);
            self.in_progress.remove(&key);
            return layout;
        }

        if self.records.contains_key(name) {
            return self.record_by_name(name);
        }

        tracing::trace!(ty = name, "unknown type");
        Layout::UNKNOWN
    }

    fn record_by_name(&mut self, name: &str) -> Layout {
        if let Some(layout) = self.cache.get(name) {
            return *layout;
        }
        let Some(record) = self.records.get(name).copied() else {
            tracing::trace!(record = name, "unknown record");
            return Layout::UNKNOWN;
        };
        let layout = self.record_layout(record);
        self.cache.insert(name.to_string(), layout);
        layout
    }

    fn builtin(&self, tokens: &[&str]) -> Layout {
        let has = |word: &str| tokens.contains(&word);
        let longs = tokens.iter().filter(|t| **t == "long").count();

        if has("void") {
            Layout::UNKNOWN
        } else if has("char") || has("_Bool") || has("bool") {
            Layout::scalar(1)
        } else if has("short") {
            Layout::scalar(2)
        } else if has("float") {
            Layout::scalar(4)
        } else if has("double") {
            if longs > 0 {
                self.model.long_double()
            } else {
                Layout::scalar(8)
            }
        } else if longs >= 2 {
            Layout::scalar(8)
        } else if longs == 1 {
            Layout::scalar(self.model.long_size())
        } else {
            Layout::scalar(4)
        }
    }

    fn fixed_width(&self, name: &str) -> Option<Layout> {
        let size = match name {
            "int8_t" | "uint8_t" => 1,
            "int16_t" | "uint16_t" | "char16_t" => 2,
            "int32_t" | "uint32_t" | "char32_t" => 4,
            "int64_t" | "uint64_t" | "off_t" => 8,
            "size_t" | "ssize_t" | "intptr_t" | "uintptr_t" | "ptrdiff_t" => {
                self.model.pointer_size()
            }
            "wchar_t" => match self.model {
                DataModel::Llp64 => 2,
                _ => 4,
            },
            _ => return None,
        };
        Some(Layout::scalar(size))
    }

    fn pointer(&self) -> Layout {
        Layout::scalar(self.model.pointer_size())
    }
}

/// Split `unsigned int : 3` into base type text and width.
fn bitfield_of(type_ref: &TypeRef) -> Option<(&str, u64)> {
    let TypeRef::Primitive(text) = type_ref else {
        return None;
    };
    let (base, width) = text.rsplit_once(" : ")?;
    Some((base, parse_dimension(width)?))
}

fn parse_dimension(text: &str) -> Option<u64> {
    let digits = text.trim().trim_end_matches(['u', 'U', 'l', 'L']);
    match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => digits.parse().ok(),
    }
}

fn align_up(value: u64, align: u64) -> u64 {
    if align <= 1 {
        value
    } else {
        value.div_ceil(align) * align
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldDecl;

    fn make_struct(name: &str, fields: &[(&str, &str)]) -> RecordDecl {
        let mut record = RecordDecl::new(name, RecordKind::Struct);
        record.fields = fields
            .iter()
            .map(|(n, t)| FieldDecl::primitive(n, t))
            .collect();
        record
    }

    fn size_of(record: &RecordDecl, others: &[RecordDecl], aliases: &[TypeAlias]) -> u64 {
        LayoutEngine::new(others, aliases, DataModel::Lp64)
            .record_layout(record)
            .size
    }

    fn alias(name: &str, target: &str) -> TypeAlias {
        TypeAlias {
            name: name.to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn test_padding_and_tail_alignment() {
        let record = make_struct("S", &[("x", "int"), ("c", "char")]);
        assert_eq!(size_of(&record, &[], &[]), 8);

        let record = make_struct("S", &[("c", "char"), ("d", "double"), ("s", "short")]);
        assert_eq!(size_of(&record, &[], &[]), 24);
    }

    #[test]
    fn test_event_union_layout() {
        let mut union = RecordDecl::new("", RecordKind::Union);
        union.fields = vec![FieldDecl::primitive("a", "int"), FieldDecl::primitive("b", "double")];
        let record = make_struct("libvlc_event_t", &[("type", "int"), ("p_obj", "void *")])
            .with_field(FieldDecl::nested("u", union));

        assert_eq!(size_of(&record, &[], &[]), 24);

        let ilp32 = LayoutEngine::new(&[], &[], DataModel::Ilp32).record_layout(&record);
        assert_eq!(ilp32.size, 16);
    }

    #[test]
    fn test_bitfields_share_storage_units() {
        let record = make_struct(
            "F",
            &[
                ("a", "unsigned int : 3"),
                ("b", "unsigned int : 5"),
                ("c", "unsigned int : 30"),
            ],
        );
        assert_eq!(size_of(&record, &[], &[]), 8);

        let record = make_struct("G", &[("a", "unsigned int : 1"), ("b", "unsigned int : 1")]);
        assert_eq!(size_of(&record, &[], &[]), 4);
    }

    #[test]
    fn test_arrays() {
        let record = make_struct("S", &[("psz_name", "char[16]"), ("i_time", "int64_t")]);
        assert_eq!(size_of(&record, &[], &[]), 24);

        let record = make_struct("M", &[("m", "int[2][3]")]);
        assert_eq!(size_of(&record, &[], &[]), 24);

        let record = make_struct("Flex", &[("n", "int"), ("data", "char[]")]);
        assert_eq!(size_of(&record, &[], &[]), 4);

        let record = make_struct("Sym", &[("n", "int"), ("data", "char[MAX_LEN]")]);
        assert_eq!(size_of(&record, &[], &[]), 4);
    }

    #[test]
    fn test_pointers_and_function_pointers() {
        let record = make_struct(
            "C",
            &[
                ("cb", "void (*)(void *opaque)"),
                ("p", "libvlc_media_t *"),
                ("pp", "int (*)[4]"),
            ],
        );
        assert_eq!(size_of(&record, &[], &[]), 24);
    }

    #[test]
    fn test_typedefs_and_named_records() {
        let inner = make_struct("inner_t", &[("a", "int"), ("b", "int")]);
        let others = vec![inner];
        let aliases = vec![
            alias("libvlc_time_t", "int64_t"),
            alias("inner_alias", "struct inner_t"),
            alias("libvlc_state_t", "enum libvlc_state_t"),
        ];

        let record = make_struct("outer", &[("i", "struct inner_t"), ("c", "char")]);
        assert_eq!(size_of(&record, &others, &aliases), 12);

        let record = make_struct("outer", &[("i", "inner_alias"), ("t", "libvlc_time_t")]);
        assert_eq!(size_of(&record, &others, &aliases), 16);

        let record = make_struct("outer", &[("s", "libvlc_state_t"), ("e", "enum other")]);
        assert_eq!(size_of(&record, &others, &aliases), 8);
    }

    #[test]
    fn test_unknown_types_contribute_nothing() {
        let record = make_struct("U", &[("x", "mystery_t")]);
        assert_eq!(size_of(&record, &[], &[]), 0);

        let record = make_struct("U", &[("x", "mystery_t"), ("y", "int")]);
        assert_eq!(size_of(&record, &[], &[]), 4);
    }

    #[test]
    fn test_opaque_record_is_zero() {
        let opaque = RecordDecl::new("libvlc_instance_t", RecordKind::Struct);
        assert_eq!(size_of(&opaque, &[], &[]), 0);
    }

    #[test]
    fn test_cycles_terminate() {
        let a = make_struct("A", &[("b", "struct B")]);
        let b = make_struct("B", &[("a", "struct A"), ("n", "int")]);
        let records = vec![a, b];
        let aliases = vec![alias("loop_t", "loop_t")];

        let mut engine = LayoutEngine::new(&records, &aliases, DataModel::Lp64);
        assert_eq!(engine.record_layout(&records[0]).size, 4);
        assert_eq!(engine.layout_of_type("loop_t"), Layout::UNKNOWN);
    }

    #[test]
    fn test_data_models() {
        let record = make_struct("L", &[("a", "long"), ("b", "unsigned long int")]);
        let lp64 = LayoutEngine::new(&[], &[], DataModel::Lp64).record_layout(&record);
        let llp64 = LayoutEngine::new(&[], &[], DataModel::Llp64).record_layout(&record);
        assert_eq!(lp64.size, 16);
        assert_eq!(llp64.size, 8);

        let record = make_struct("P", &[("p", "void *"), ("n", "size_t")]);
        let ilp32 = LayoutEngine::new(&[], &[], DataModel::Ilp32).record_layout(&record);
        assert_eq!(ilp32.size, 8);
    }

    #[test]
    fn test_apply_sizes_nested_records() {
        let mut union = RecordDecl::new("", RecordKind::Union);
        union.fields = vec![FieldDecl::primitive("a", "int"), FieldDecl::primitive("b", "int64_t")];
        let records = vec![make_struct("E", &[("type", "int")]).with_field(FieldDecl::nested("u", union))];

        let sized = apply(&records, &[], DataModel::Lp64);

        assert_eq!(sized[0].size_in_bytes, 16);
        let inner = sized[0].fields[1].type_ref.as_record().map(|r| r.size_in_bytes);
        assert_eq!(inner, Some(8));
    }
}
