//! C header extractor using tree-sitter.

use tree_sitter::{Node, Parser};

use super::helpers::{
    children_by_field, find_child_by_type, get_node_text, get_normalized_text, get_start_line,
};
use super::preprocess::preprocess;
use super::{HeaderUnit, ParserOptions, TypeAlias};
use crate::error::{HdiffError, Result};
use crate::types::{FieldDecl, FunctionDecl, RecordDecl, RecordKind};

/// Parse the text of one header.
pub fn parse(source: &str, path: &str, options: &ParserOptions) -> Result<HeaderUnit> {
    let text = preprocess(source, &options.strip_macros);

    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_c::LANGUAGE.into())?;

    let tree = parser.parse(&text, None).ok_or_else(|| HdiffError::Parse {
        path: path.to_string(),
        message: "tree-sitter produced no tree".to_string(),
    })?;
    let root = tree.root_node();

    let mut extractor = Extractor {
        source: &text,
        original: source,
        path,
        unit: HeaderUnit::new(path),
    };
    extractor.unit.has_errors = root.has_error();
    if extractor.unit.has_errors {
        tracing::debug!(path, "header has syntax errors, keeping what parsed");
    }

    extractor.walk_items(&root);
    Ok(extractor.unit)
}

struct Extractor<'a> {
    /// Rewritten text the tree was built from.
    source: &'a str,
    /// Untouched header text, byte-aligned with `source`.
    original: &'a str,
    path: &'a str,
    unit: HeaderUnit,
}

impl Extractor<'_> {
    fn walk_items(&mut self, node: &Node) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "declaration" => self.extract_declaration(&child),
                "function_definition" => self.extract_function_definition(&child),
                "type_definition" => self.extract_type_definition(&child),
                "struct_specifier" | "union_specifier" => {
                    let doc = self.documentation(&child);
                    self.extract_record(&child, None, doc);
                }
                "preproc_ifdef" | "preproc_if" | "preproc_else" | "preproc_elif"
                | "linkage_specification" | "declaration_list" | "ERROR" => {
                    self.walk_items(&child)
                }
                _ => {}
            }
        }
    }

    fn extract_declaration(&mut self, node: &Node) {
        let doc = self.documentation(node);

        if let Some(ty) = node.child_by_field_name("type") {
            if is_record_specifier(&ty) && ty.child_by_field_name("body").is_some() {
                self.extract_record(&ty, None, doc.clone());
            }
        }

        let prefix = type_prefix(node, self.source);
        for declarator in children_by_field(node, "declarator") {
            if let Some(mut func) = self.function(&declarator, &prefix) {
                func.documentation = doc.clone();
                self.unit.functions.push(func);
            }
        }
    }

    fn extract_function_definition(&mut self, node: &Node) {
        let Some(declarator) = node.child_by_field_name("declarator") else {
            return;
        };
        let prefix = type_prefix(node, self.source);
        if let Some(mut func) = self.function(&declarator, &prefix) {
            func.documentation = self.documentation(node);
            self.unit.functions.push(func);
        }
    }

    /// Build a function from a declarator that names one.
    fn function(&self, declarator: &Node, return_base: &str) -> Option<FunctionDecl> {
        let mut node = *declarator;
        let mut stars = 0;
        while node.kind() == "pointer_declarator" {
            stars += 1;
            node = node.child_by_field_name("declarator")?;
        }
        if node.kind() != "function_declarator" {
            return None;
        }

        let name = node.child_by_field_name("declarator")?;
        if name.kind() != "identifier" {
            return None;
        }

        let mut func = FunctionDecl::new(get_node_text(&name, self.source), self.path);
        func.return_type = with_stars(return_base, stars);
        func.parameters = node
            .child_by_field_name("parameters")
            .map(|params| parameter_texts(&params, self.source))
            .unwrap_or_default();
        Some(func)
    }

    fn extract_type_definition(&mut self, node: &Node) {
        let doc = self.documentation(node);
        let Some(ty) = node.child_by_field_name("type") else {
            return;
        };
        let declarators = children_by_field(node, "declarator");

        let base = if is_record_specifier(&ty) {
            let typedef_name = declarators
                .iter()
                .find(|d| d.kind() == "type_identifier")
                .map(|d| get_node_text(d, self.source).to_string());
            match self.extract_record(&ty, typedef_name.as_deref(), doc) {
                Some(name) => format!("{} {}", record_kind(&ty).as_str(), name),
                None => return,
            }
        } else {
            type_prefix(node, self.source)
        };

        for declarator in &declarators {
            let shape = DeclaratorShape::read(declarator, self.source);
            if shape.name.is_empty() {
                continue;
            }
            self.unit.aliases.push(TypeAlias {
                target: shape.type_text(&base),
                name: shape.name,
            });
        }
    }

    /// Register a struct/union specifier and return the record name.
    ///
    /// The name is the tag, or `typedef_name` for anonymous typedef'd
    /// records. Specifiers without a body are forward declarations.
    fn extract_record(
        &mut self,
        node: &Node,
        typedef_name: Option<&str>,
        documentation: Option<String>,
    ) -> Option<String> {
        let name = match node.child_by_field_name("name") {
            Some(tag) => get_node_text(&tag, self.source).to_string(),
            None => match typedef_name {
                Some(name) => name.to_string(),
                None => {
                    tracing::trace!(
                        path = self.path,
                        line = get_start_line(node),
                        "skipping anonymous record"
                    );
                    return None;
                }
            },
        };

        let mut record = RecordDecl::new(name.clone(), record_kind(node)).with_source_path(self.path);
        record.documentation = documentation;

        match node.child_by_field_name("body") {
            Some(body) => {
                record.fields = self.fields(&body);
                self.unit.records.push(record);
            }
            None => self.unit.forward_declarations.push(record),
        }

        Some(name)
    }

    fn fields(&self, body: &Node) -> Vec<FieldDecl> {
        let mut fields = Vec::new();
        self.collect_fields(body, &mut fields);
        fields
    }

    fn collect_fields(&self, node: &Node, out: &mut Vec<FieldDecl>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "field_declaration" => self.field_declaration(&child, out),
                "preproc_ifdef" | "preproc_if" | "preproc_else" | "preproc_elif" => {
                    self.collect_fields(&child, out)
                }
                _ => {}
            }
        }
    }

    fn field_declaration(&self, node: &Node, out: &mut Vec<FieldDecl>) {
        let declarators = children_by_field(node, "declarator");
        let inline = node
            .child_by_field_name("type")
            .filter(is_record_specifier)
            .and_then(|ty| ty.child_by_field_name("body").map(|body| (ty, body)));

        if let Some((ty, body)) = inline {
            let tag = ty
                .child_by_field_name("name")
                .map(|n| get_node_text(&n, self.source).to_string())
                .unwrap_or_default();
            let mut nested = RecordDecl::new(tag, record_kind(&ty)).with_source_path(self.path);
            nested.fields = self.fields(&body);

            if declarators.is_empty() {
                out.push(FieldDecl::nested("", nested));
                return;
            }
            for declarator in &declarators {
                let shape = DeclaratorShape::read(declarator, self.source);
                if shape.is_plain() {
                    out.push(FieldDecl::nested(&shape.name, nested.clone()));
                } else {
                    let base = specifier_text(&ty, self.source);
                    out.push(FieldDecl::primitive(&shape.name, &shape.type_text(&base)));
                }
            }
            return;
        }

        let base = type_prefix(node, self.source);
        let width = find_child_by_type(node, "bitfield_clause").map(|clause| {
            get_normalized_text(&clause, self.source)
                .trim_start_matches(':')
                .trim()
                .to_string()
        });
        let with_width = |text: String| match &width {
            Some(width) => format!("{} : {}", text, width),
            None => text,
        };

        if declarators.is_empty() {
            out.push(FieldDecl::primitive("", &with_width(base)));
            return;
        }
        for declarator in &declarators {
            let shape = DeclaratorShape::read(declarator, self.source);
            out.push(FieldDecl::primitive(&shape.name, &with_width(shape.type_text(&base))));
        }
    }

    /// Doc comments immediately preceding `node`.
    fn documentation(&self, node: &Node) -> Option<String> {
        let mut blocks = Vec::new();
        let mut next_start = node.start_byte();
        let mut prev = node.prev_sibling();

        while let Some(comment) = prev {
            if comment.kind() != "comment" {
                break;
            }
            let gap = self.original.get(comment.end_byte()..next_start).unwrap_or("");
            if has_blank_line(gap) {
                break;
            }
            match doc_text(get_node_text(&comment, self.original)) {
                Some(doc) => blocks.push(doc),
                None => break,
            }
            next_start = comment.start_byte();
            prev = comment.prev_sibling();
        }

        if blocks.is_empty() {
            return None;
        }
        blocks.reverse();
        Some(blocks.join("\n"))
    }
}

/// How a declarator shapes the base type it is applied to.
#[derive(Debug, Default)]
struct DeclaratorShape {
    name: String,
    stars: usize,
    dims: Vec<String>,
    function_params: Option<String>,
    /// A pointer inside parentheses: `(*name)[4]`, `(*name)(int)`.
    indirect: bool,
}

impl DeclaratorShape {
    fn read(node: &Node, source: &str) -> Self {
        let mut shape = Self::default();
        shape.visit(*node, source, false);
        shape.dims.reverse();
        shape
    }

    fn visit(&mut self, node: Node, source: &str, in_parens: bool) {
        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "primitive_type" => {
                self.name = get_node_text(&node, source).to_string();
            }
            "pointer_declarator" => {
                if in_parens {
                    self.indirect = true;
                } else {
                    self.stars += 1;
                }
                self.visit_field(node, "declarator", source, in_parens);
            }
            "array_declarator" => {
                let size = node
                    .child_by_field_name("size")
                    .map(|s| get_normalized_text(&s, source))
                    .unwrap_or_default();
                self.dims.push(size);
                self.visit_field(node, "declarator", source, in_parens);
            }
            "function_declarator" => {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|p| parameter_texts(&p, source).join(", "))
                    .unwrap_or_default();
                self.function_params = Some(params);
                self.visit_field(node, "declarator", source, in_parens);
            }
            "parenthesized_declarator" | "attributed_declarator" => {
                let nested = in_parens || node.kind() == "parenthesized_declarator";
                if let Some(inner) = node.named_child(0) {
                    self.visit(inner, source, nested);
                }
            }
            "init_declarator" => self.visit_field(node, "declarator", source, in_parens),
            _ => {}
        }
    }

    fn visit_field(&mut self, node: Node, field: &str, source: &str, in_parens: bool) {
        if let Some(inner) = node.child_by_field_name(field) {
            self.visit(inner, source, in_parens);
        }
    }

    fn is_plain(&self) -> bool {
        self.stars == 0 && self.dims.is_empty() && self.function_params.is_none() && !self.indirect
    }

    /// Type text for a declarator applied to `base`.
    fn type_text(&self, base: &str) -> String {
        let mut text = with_stars(base, self.stars);
        if let Some(params) = &self.function_params {
            let params = if params.is_empty() { "void" } else { params };
            return format!("{} (*)({})", text, params);
        }
        if self.indirect {
            text.push_str(" (*)");
        }
        for dim in &self.dims {
            text.push('[');
            text.push_str(dim);
            text.push(']');
        }
        text
    }
}

fn is_record_specifier(node: &Node) -> bool {
    matches!(node.kind(), "struct_specifier" | "union_specifier")
}

fn record_kind(node: &Node) -> RecordKind {
    if node.kind() == "union_specifier" {
        RecordKind::Union
    } else {
        RecordKind::Struct
    }
}

/// `struct tag`, `enum tag`, or the normalized text of any other specifier.
fn specifier_text(node: &Node, source: &str) -> String {
    let keyword = match node.kind() {
        "struct_specifier" => "struct",
        "union_specifier" => "union",
        "enum_specifier" => "enum",
        _ => return get_normalized_text(node, source),
    };
    match node.child_by_field_name("name") {
        Some(name) => format!("{} {}", keyword, get_node_text(&name, source)),
        None => keyword.to_string(),
    }
}

/// Qualifiers and type specifier written before the first declarator.
fn type_prefix(node: &Node, source: &str) -> String {
    let mut parts = Vec::new();
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            match cursor.field_name() {
                Some("declarator") => break,
                Some("type") => parts.push(specifier_text(&child, source)),
                _ if child.kind() == "type_qualifier" => {
                    parts.push(get_normalized_text(&child, source))
                }
                _ => {}
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    parts.join(" ")
}

/// Whitespace-normalized parameter texts; `(void)` yields none.
fn parameter_texts(params: &Node, source: &str) -> Vec<String> {
    let mut cursor = params.walk();
    let texts: Vec<String> = params
        .named_children(&mut cursor)
        .filter(|p| matches!(p.kind(), "parameter_declaration" | "variadic_parameter"))
        .map(|p| get_normalized_text(&p, source))
        .collect();

    if texts.len() == 1 && texts[0] == "void" {
        Vec::new()
    } else {
        texts
    }
}

fn with_stars(base: &str, stars: usize) -> String {
    if stars == 0 {
        base.to_string()
    } else {
        format!("{} {}", base, "*".repeat(stars))
    }
}

/// True when the text between two nodes contains an empty line.
fn has_blank_line(gap: &str) -> bool {
    let lines: Vec<&str> = gap.split('\n').collect();
    lines.len() > 2 && lines[1..lines.len() - 1].iter().any(|l| l.trim().is_empty())
}

/// Body of a doc-style comment with delimiters and leading `*` removed.
fn doc_text(comment: &str) -> Option<String> {
    let body = if let Some(rest) = comment
        .strip_prefix("/**")
        .or_else(|| comment.strip_prefix("/*!"))
    {
        if rest.starts_with('<') || rest == "/" {
            return None;
        }
        rest.strip_suffix("*/").unwrap_or(rest)
    } else if let Some(rest) = comment
        .strip_prefix("///")
        .or_else(|| comment.strip_prefix("//!"))
    {
        if rest.starts_with('<') || rest.starts_with('/') {
            return None;
        }
        rest
    } else {
        return None;
    };

    let lines: Vec<String> = body
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim().to_string())
        .collect();

    let start = lines.iter().position(|l| !l.is_empty())?;
    let end = lines.iter().rposition(|l| !l.is_empty())?;
    Some(lines[start..=end].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRef;

    fn parse_header(source: &str) -> HeaderUnit {
        parse(source, "include/vlc/libvlc.h", &ParserOptions::default()).unwrap()
    }

    #[test]
    fn test_function_prototypes() {
        let unit = parse_header(
            r#"
LIBVLC_API libvlc_instance_t *
libvlc_new( int argc , const char *const *argv );

LIBVLC_API void libvlc_release( libvlc_instance_t *p_instance );

LIBVLC_API const char * libvlc_get_version(void);

LIBVLC_API int libvlc_printf(const char *fmt, ...);
"#,
        );

        let names: Vec<_> = unit.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["libvlc_new", "libvlc_release", "libvlc_get_version", "libvlc_printf"]
        );

        let new = &unit.functions[0];
        assert_eq!(new.return_type, "libvlc_instance_t *");
        assert_eq!(new.parameters, vec!["int argc", "const char *const *argv"]);
        assert_eq!(new.source_path, "include/vlc/libvlc.h");

        assert_eq!(
            unit.functions[2].signature(),
            "const char *libvlc_get_version(void)"
        );
        assert_eq!(unit.functions[3].parameters, vec!["const char *fmt", "..."]);
    }

    #[test]
    fn test_function_documentation() {
        let unit = parse_header(
            r#"
/**
 * Create and initialize a libvlc instance.
 *
 * \param argc the number of arguments
 */
LIBVLC_API int libvlc_init(int argc);

/** Not attached */

LIBVLC_API void libvlc_plain(void);

/* regular comment */
LIBVLC_API void libvlc_regular(void);
"#,
        );

        assert_eq!(
            unit.functions[0].documentation.as_deref(),
            Some("Create and initialize a libvlc instance.\n\n\\param argc the number of arguments")
        );
        assert_eq!(unit.functions[1].documentation, None);
        assert_eq!(unit.functions[2].documentation, None);
    }

    #[test]
    fn test_deprecation_marker_survives_macro_line() {
        let unit = parse_header(
            r#"
/**
 * \deprecated Use libvlc_media_player_get_length() instead
 */
LIBVLC_DEPRECATED LIBVLC_API
int libvlc_old_length(void);
"#,
        );

        assert_eq!(unit.functions.len(), 1);
        assert_eq!(
            unit.functions[0].documentation.as_deref(),
            Some("\\deprecated Use libvlc_media_player_get_length() instead")
        );
    }

    #[test]
    fn test_guards_and_conditionals_are_transparent() {
        let unit = parse_header(
            r#"
#ifndef VLC_LIBVLC_H
#define VLC_LIBVLC_H 1

# ifdef __cplusplus
extern "C" {
# endif

#include <stdarg.h>

#if defined(_WIN32)
LIBVLC_API int libvlc_win_only(void);
#else
LIBVLC_API int libvlc_posix_only(void);
#endif

# ifdef __cplusplus
}
# endif

#endif
"#,
        );

        let names: Vec<_> = unit.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["libvlc_win_only", "libvlc_posix_only"]);
    }

    #[test]
    fn test_records_and_forward_declarations() {
        let unit = parse_header(
            r#"
/** Opaque instance */
typedef struct libvlc_instance_t libvlc_instance_t;

/** Statistics */
typedef struct libvlc_media_stats_t
{
    int         i_read_bytes;
    float       f_input_bitrate;
    char        psz_name[64];
    void      (*pf_callback)(void *opaque, int x);
    unsigned int b_flag : 1;
} libvlc_media_stats_t;

typedef struct
{
    int i_x;
} libvlc_anon_t;

typedef int64_t libvlc_time_t;
typedef void (*libvlc_callback_t)(const struct libvlc_event_t *p_event, void *p_data);
"#,
        );

        assert_eq!(unit.forward_declarations.len(), 1);
        let opaque = &unit.forward_declarations[0];
        assert_eq!(opaque.name, "libvlc_instance_t");
        assert_eq!(opaque.documentation.as_deref(), Some("Opaque instance"));

        let names: Vec<_> = unit.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["libvlc_media_stats_t", "libvlc_anon_t"]);

        let stats = &unit.records[0];
        assert_eq!(stats.documentation.as_deref(), Some("Statistics"));
        let types: Vec<_> = stats.fields.iter().map(|f| f.type_ref.display_name()).collect();
        assert_eq!(
            types,
            vec![
                "int",
                "float",
                "char[64]",
                "void (*)(void *opaque, int x)",
                "unsigned int : 1",
            ]
        );
        assert_eq!(stats.fields[3].name, "pf_callback");

        let alias = |name: &str| {
            unit.aliases
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.target.clone())
        };
        assert_eq!(alias("libvlc_instance_t").as_deref(), Some("struct libvlc_instance_t"));
        assert_eq!(alias("libvlc_time_t").as_deref(), Some("int64_t"));
        assert_eq!(alias("libvlc_anon_t").as_deref(), Some("struct libvlc_anon_t"));
        assert!(alias("libvlc_callback_t").is_some_and(|t| t.contains("(*)")));
    }

    #[test]
    fn test_event_union_is_nested_record() {
        let unit = parse_header(
            r#"
typedef struct libvlc_event_t
{
    int   type;
    void *p_obj;
    union
    {
        struct
        {
            libvlc_meta_t meta_type;
        } media_meta_changed;
        struct
        {
            int64_t new_duration;
        } media_duration_changed;
    } u;
} libvlc_event_t;
"#,
        );

        let event = &unit.records[0];
        assert_eq!(event.name, "libvlc_event_t");
        assert_eq!(event.fields.len(), 3);
        assert_eq!(event.fields[1].type_ref, TypeRef::primitive("void *"));

        let union = event.field("u").and_then(|f| f.type_ref.as_record()).unwrap();
        assert_eq!(union.kind, RecordKind::Union);
        let members: Vec<_> = union.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(members, vec!["media_meta_changed", "media_duration_changed"]);
        assert!(union.fields[0].type_ref.as_record().is_some());
    }

    #[test]
    fn test_anonymous_member_has_empty_name() {
        let unit = parse_header(
            r#"
struct libvlc_variant
{
    int i_type;
    union
    {
        int i_value;
        float f_value;
    };
};
"#,
        );

        let record = &unit.records[0];
        assert_eq!(record.name, "libvlc_variant");
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields[1].name, "");
        assert!(record.fields[1].type_ref.as_record().is_some());
    }

    #[test]
    fn test_inline_function_definition() {
        let unit = parse_header(
            r#"
static inline int libvlc_helper(int x)
{
    return x + 1;
}
"#,
        );

        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.functions[0].signature(), "int libvlc_helper(int x)");
    }

    #[test]
    fn test_doc_text_variants() {
        assert_eq!(doc_text("/** one line */").as_deref(), Some("one line"));
        assert_eq!(doc_text("/*! bang */").as_deref(), Some("bang"));
        assert_eq!(doc_text("/// slashes").as_deref(), Some("slashes"));
        assert_eq!(doc_text("/**< trailing member */"), None);
        assert_eq!(doc_text("/* plain */"), None);
        assert_eq!(doc_text("/**/"), None);
        assert_eq!(doc_text("/** */"), None);
    }

    #[test]
    fn test_has_blank_line() {
        assert!(!has_blank_line("\n"));
        assert!(!has_blank_line("\nLIBVLC_API\n"));
        assert!(has_blank_line("\n\n"));
        assert!(has_blank_line("\n   \n  "));
    }
}
