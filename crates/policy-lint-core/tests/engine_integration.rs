//! Integration test: matcher → filter → resolver → reporter → planner via
//! [`Engine`], on trees built in code and on JSON dumps under
//! `tests/fixtures/units/`.

use policy_lint_core::source::{FileKind, LineDirective, SourceFile};
use policy_lint_core::testing::{loc, macro_range, range, TreeBuilder};
use policy_lint_core::{
    AnnotationPolicy, CastKind, Engine, ExclusionList, ListKind, Matcher, Message, Node, NodeKind,
    RawLocation, RewriteContext, Rule, RuleMatch, RuleTarget, Severity, SourceRange, SyntaxTree,
    Type, TypeMatcher,
};
use std::path::PathBuf;

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/units")
}

fn at(text: &str, needle: &str) -> u32 {
    let offset = text.find(needle).expect("needle in fixture text");
    u32::try_from(offset).expect("small fixture")
}

// ── Rules used by the tests ──

/// Flags fields whose underlying type is `std::vector<…>`.
struct VectorField {
    matcher: Matcher,
}

impl VectorField {
    fn new() -> Self {
        Self {
            matcher: Matcher::all_of(vec![
                Matcher::kind(NodeKind::Field),
                Matcher::has_type(TypeMatcher::underlying(TypeMatcher::specialization(
                    "std::vector",
                ))),
            ]),
        }
    }
}

impl Rule for VectorField {
    fn name(&self) -> &'static str {
        "vector-field"
    }
    fn code(&self) -> &'static str {
        "T001"
    }
    fn matcher(&self) -> &Matcher {
        &self.matcher
    }
    fn target(&self) -> RuleTarget {
        RuleTarget::Declaration
    }
    fn annotation_policy(&self) -> AnnotationPolicy {
        AnnotationPolicy {
            suppress: &["allow_vector"],
            ..AnnotationPolicy::default()
        }
    }
    fn message(&self, m: &RuleMatch<'_>) -> Message {
        Message::new("field '%0' uses std::vector").arg(m.display_name())
    }
    fn supports_rewrite(&self) -> bool {
        true
    }
    fn rewrite(&self, m: &RuleMatch<'_>, edits: &mut RewriteContext<'_>) {
        if let Some(type_range) = m.node().type_range {
            edits.replace(type_range, "Vector<int>");
            edits.include_user_header("wtf/vector.h");
        }
    }
}

/// Flags bit-casts outside a suppression scope.
struct BadCast {
    matcher: Matcher,
}

impl BadCast {
    fn new() -> Self {
        Self {
            matcher: Matcher::all_of(vec![
                Matcher::kind(NodeKind::Cast),
                Matcher::CastKind(CastKind::BitCast),
                Matcher::not(Matcher::ancestor(Matcher::kind(NodeKind::SuppressScope))),
            ]),
        }
    }
}

impl Rule for BadCast {
    fn name(&self) -> &'static str {
        "bad-cast"
    }
    fn code(&self) -> &'static str {
        "T002"
    }
    fn default_severity(&self) -> Severity {
        Severity::Warning
    }
    fn matcher(&self) -> &Matcher {
        &self.matcher
    }
    fn message(&self, _m: &RuleMatch<'_>) -> Message {
        Message::new("bit-cast")
    }
}

fn engine() -> Engine {
    Engine::builder()
        .rule(VectorField::new())
        .rule(BadCast::new())
        .build()
        .expect("engine should build")
}

// ── Fixtures ──

const NODE_H: &str = "\
namespace blink {
struct Node {
  std::vector<int> a;
  std::vector<int> b [[allow_vector]];
  IntVec c;
};
}
";

/// `blink::Node` with an unannotated vector field, an annotated one and one
/// spelled through `using IntVec = VecAlias; using VecAlias = std::vector<int>;`.
fn node_tree(path: &str) -> SyntaxTree {
    let mut b = TreeBuilder::new(path);
    let f = b.file_with_text(path, NODE_H);
    let int = b.builtin("int");
    let vector = b.record("std::vector", vec![int]);
    let inner_alias = b.alias("blink::VecAlias", vector);
    let outer_alias = b.alias("blink::IntVec", inner_alias);

    let end = u32::try_from(NODE_H.len()).expect("small fixture");
    let ns = b.node(
        b.root(),
        Node::new(NodeKind::Namespace, range(f, 0, end)).named("blink"),
    );
    let record = b.node(
        ns,
        Node::new(NodeKind::Record, range(f, at(NODE_H, "struct"), at(NODE_H, "};")))
            .named("blink::Node"),
    );
    let a = at(NODE_H, "std::vector<int> a");
    b.node(
        record,
        Node::new(NodeKind::Field, range(f, a, a + 18))
            .named("blink::Node::a")
            .typed(vector)
            .with_type_range(range(f, a, a + 16)),
    );
    let bb = at(NODE_H, "std::vector<int> b");
    b.node(
        record,
        Node::new(NodeKind::Field, range(f, bb, bb + 18))
            .named("blink::Node::b")
            .typed(vector)
            .with_type_range(range(f, bb, bb + 16))
            .annotated("allow_vector"),
    );
    let c = at(NODE_H, "IntVec c");
    b.node(
        record,
        Node::new(NodeKind::Field, range(f, c, c + 8))
            .named("blink::Node::c")
            .typed(outer_alias)
            .with_type_range(range(f, c, c + 6)),
    );
    b.build()
}

const CASTS_CC: &str = "\
void f(Foo* p) {
  A(p);
  UNSAFE(A(p));
}
";

/// Two expansions of a macro producing a bit-cast; the second is wrapped in
/// a suppression scope.
fn casts_tree() -> SyntaxTree {
    let mut b = TreeBuilder::new("casts.cc");
    let f = b.file_with_text("casts.cc", CASTS_CC);
    let m = b.file_with_text("macros.h", "#define A(x) bit_cast<T*>(x)\n");
    let first = at(CASTS_CC, "A(p);");
    let second = at(CASTS_CC, "A(p))");
    let e1 = b.expansion("A", loc(m, 13), range(f, first, first + 4));
    let e2 = b.expansion("A", loc(m, 13), range(f, second, second + 4));

    let func = b.node(
        b.root(),
        Node::new(NodeKind::Function, range(f, 0, at(CASTS_CC, "}\n") + 1)).named("f"),
    );
    let body = b.node(func, Node::new(NodeKind::Block, range(f, 15, at(CASTS_CC, "}\n") + 1)));
    b.node(
        body,
        Node::new(NodeKind::Cast, macro_range(e1, 0, 14)).with_cast_kind(CastKind::BitCast),
    );
    let unsafe_at = at(CASTS_CC, "UNSAFE");
    let scope = b.node(
        body,
        Node::new(NodeKind::SuppressScope, range(f, unsafe_at, unsafe_at + 12)),
    );
    b.node(
        scope,
        Node::new(NodeKind::Cast, macro_range(e2, 0, 14)).with_cast_kind(CastKind::BitCast),
    );
    b.build()
}

// ── Properties ──

#[test]
fn annotated_field_is_suppressed_and_alias_chain_flagged_at_use() {
    let report = engine().run_tree(&node_tree("third_party/blink/node.h"));

    let found: Vec<(String, u32)> = report
        .diagnostics
        .iter()
        .map(|d| (d.message.clone(), d.location.line))
        .collect();
    assert_eq!(
        found,
        vec![
            ("field 'blink::Node::a' uses std::vector".to_string(), 3),
            ("field 'blink::Node::c' uses std::vector".to_string(), 5),
        ]
    );
    assert_eq!(report.diagnostics[0].location.column, 3);
}

#[test]
fn suppress_scope_leaves_one_diagnostic_at_unwrapped_site() {
    let report = engine().run_tree(&casts_tree());
    assert_eq!(report.diagnostics.len(), 1);
    let d = &report.diagnostics[0];
    assert_eq!(d.rule, "bad-cast");
    assert_eq!(d.severity, Severity::Warning);
    assert_eq!((d.location.line, d.location.column), (2, 3));
}

#[test]
fn macro_locations_collapse_to_one_diagnostic() {
    // One macro invocation whose expansion contains two casts.
    let mut b = TreeBuilder::new("m.cc");
    let f = b.file_with_text("m.cc", "void g() { TWO_CASTS(); }\n");
    let m = b.file("macros.h");
    let e = b.expansion("TWO_CASTS", loc(m, 20), range(f, 11, 22));
    let func = b.node(b.root(), Node::new(NodeKind::Function, range(f, 0, 25)).named("g"));
    for offset in [0, 30] {
        b.node(
            func,
            Node::new(NodeKind::Cast, macro_range(e, offset, offset + 10))
                .with_cast_kind(CastKind::BitCast),
        );
    }
    let report = engine().run_tree(&b.build());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].location.column, 12);
}

#[test]
fn excluded_path_prefix_silences_whole_file() {
    let mut list = ExclusionList::new();
    list.add_path("third_party/blink/").expect("valid pattern");
    let engine = Engine::builder()
        .rule(VectorField::new())
        .exclusion_list(list, vec![])
        .build()
        .expect("engine should build");

    let report = engine.run_tree(&node_tree("third_party/blink/node.h"));
    assert!(report.diagnostics.is_empty());

    let report = engine.run_tree(&node_tree("chrome/node.h"));
    assert_eq!(report.diagnostics.len(), 2);
}

#[test]
fn symbol_exclusion_and_list_scoping() {
    let (symbols, warnings) =
        ExclusionList::parse(ListKind::Symbols, "# fields\nblink::Node::a\n", "fields.txt");
    assert!(warnings.is_empty());
    let engine = Engine::builder()
        .rule(VectorField::new())
        .rule(BadCast::new())
        .exclusion_list(symbols.clone(), vec!["vector-field".into()])
        .build()
        .expect("engine should build");
    let report = engine.run_tree(&node_tree("node.h"));
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].location.line, 5);

    // Scoped to another rule, the list does not apply.
    let engine = Engine::builder()
        .rule(VectorField::new())
        .rule(BadCast::new())
        .exclusion_list(symbols, vec!["bad-cast".into()])
        .build()
        .expect("engine should build");
    assert_eq!(engine.run_tree(&node_tree("node.h")).diagnostics.len(), 2);
}

#[test]
fn line_directive_does_not_escape_path_policy() {
    let mut tree = node_tree("third_party/blink/node.h");
    tree.sources.files[0].line_directives.push(LineDirective {
        offset: 0,
        line: 38,
        file: Some("some_other_file.h".into()),
    });

    let unfiltered = engine().run_tree(&tree);
    assert_eq!(unfiltered.diagnostics.len(), 2);
    assert_eq!(
        unfiltered.diagnostics[0].location.file,
        PathBuf::from("some_other_file.h")
    );
    assert_eq!(unfiltered.diagnostics[0].location.line, 40);

    let engine = Engine::builder()
        .rule(VectorField::new())
        .exclude("third_party/")
        .build()
        .expect("engine should build");
    assert!(engine.run_tree(&tree).diagnostics.is_empty());
}

#[test]
fn system_headers_are_never_reported() {
    let mut b = TreeBuilder::new("sys.cc");
    let sys = b.file_of_kind("/usr/include/c++/v1/vector", FileKind::System);
    b.node(
        b.root(),
        Node::new(NodeKind::Cast, range(sys, 10, 20)).with_cast_kind(CastKind::BitCast),
    );
    assert!(engine().run_tree(&b.build()).diagnostics.is_empty());
}

const TEMPLATE_H: &str = "\
template <class T> struct S { T v; };
template <class T> void h(T* p) { bit_cast<int*>(p); }
";

#[test]
fn instantiations_count_for_use_sites_only() {
    let mut b = TreeBuilder::new("t.h");
    let f = b.file_with_text("t.h", TEMPLATE_H);
    let t = b.ty(Type::TemplateParam { name: "T".into() });
    let int = b.builtin("int");
    let vector = b.record("std::vector", vec![int]);

    // `S<std::vector<int>>`: only the instantiated field has a vector type.
    let v = at(TEMPLATE_H, "T v");
    let pattern = b.node(b.root(), Node::new(NodeKind::Record, range(f, 19, 37)).named("S"));
    let field = b.node(
        pattern,
        Node::new(NodeKind::Field, range(f, v, v + 3)).named("S::v").typed(t),
    );
    let instance = b.node(
        b.root(),
        Node::new(NodeKind::Record, range(f, 19, 37))
            .named("S")
            .instantiated_from(pattern),
    );
    b.node(
        instance,
        Node::new(NodeKind::Field, range(f, v, v + 3))
            .named("S::v")
            .typed(vector)
            .instantiated_from(field),
    );

    // `h<Foo>`: the cast is only a bit-cast once `T` is known.
    let cast_at = at(TEMPLATE_H, "bit_cast");
    let cast_range = range(f, cast_at, cast_at + 17);
    let h = b.node(b.root(), Node::new(NodeKind::Function, range(f, 38, 92)).named("h"));
    let dependent = b.node(
        h,
        Node::new(NodeKind::Cast, cast_range).with_cast_kind(CastKind::Other),
    );
    let h_foo = b.node(
        b.root(),
        Node::new(NodeKind::Function, range(f, 38, 92))
            .named("h")
            .instantiated_from(h),
    );
    b.node(
        h_foo,
        Node::new(NodeKind::Cast, cast_range)
            .with_cast_kind(CastKind::BitCast)
            .instantiated_from(dependent),
    );

    let report = engine().run_tree(&b.build());
    let per_rule = |rule: &str| report.diagnostics.iter().filter(|d| d.rule == rule).count();
    assert_eq!(per_rule("vector-field"), 0);
    assert_eq!(per_rule("bad-cast"), 1);
    assert_eq!(report.diagnostics[0].location.line, 2);
}

#[test]
fn unresolvable_anchor_degrades_to_enclosing_node() {
    let mut b = TreeBuilder::new("paste.cc");
    let f = b.file_with_text("paste.cc", "void k() {\n  PASTE(a, b);\n}\n");
    let scratch = b.file_of_kind("<scratch space>", FileKind::Scratch);
    let func = b.node(b.root(), Node::new(NodeKind::Function, range(f, 0, 27)).named("k"));
    b.node(
        func,
        Node::new(NodeKind::Cast, range(scratch, 0, 4)).with_cast_kind(CastKind::BitCast),
    );
    let report = engine().run_tree(&b.build());
    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.diagnostics[0].degraded);
    assert_eq!(report.diagnostics[0].location.line, 1);
}

#[test]
fn runs_are_deterministic() {
    let engine = engine();
    let first = serde_json::to_string(&engine.run_tree(&node_tree("a/node.h")))
        .expect("serializable");
    let second = serde_json::to_string(&engine.run_tree(&node_tree("a/node.h")))
        .expect("serializable");
    assert_eq!(first, second);
}

// ── Rewrites ──

#[test]
fn rewrite_mode_produces_edits_and_includes() {
    let engine = Engine::builder()
        .rule(VectorField::new())
        .rewrite(true)
        .build()
        .expect("engine should build");
    let report = engine.run_tree(&node_tree("node.h"));
    assert_eq!(report.conflicts, 0);

    let mut run = policy_lint_core::RunReport::new();
    run.units.push(report);
    let script = run.edit_script();
    let a = at(NODE_H, "std::vector<int> a");
    let c = at(NODE_H, "IntVec c");
    assert_eq!(
        script.render(),
        format!(
            "include-user-header:::node.h:::-1:::-1:::wtf/vector.h\n\
             r:::node.h:::{a}:::16:::Vector<int>\n\
             r:::node.h:::{c}:::6:::Vector<int>\n"
        )
    );
}

#[test]
fn overlapping_edits_keep_the_first_and_do_not_fail() {
    let mut tree = node_tree("node.h");
    // Make the type range of `c` swallow the one of `a`.
    let a = at(NODE_H, "std::vector<int> a");
    let c_field = tree
        .nodes
        .iter()
        .position(|n| n.name.as_deref() == Some("c"))
        .expect("field c");
    tree.nodes[c_field].type_range = Some(SourceRange::new(
        RawLocation::file(policy_lint_core::FileId(0), a + 4),
        RawLocation::file(policy_lint_core::FileId(0), a + 10),
    ));

    let engine = Engine::builder()
        .rule(VectorField::new())
        .rewrite(true)
        .build()
        .expect("engine should build");
    let report = engine.run_tree(&tree);
    assert_eq!(report.diagnostics.len(), 2);
    assert_eq!(report.conflicts, 1);
    let replacements: Vec<u32> = report
        .edits
        .iter()
        .filter(|e| e.kind == policy_lint_core::EditKind::Replace)
        .map(|e| e.offset)
        .collect();
    assert_eq!(replacements, vec![a]);
}

// ── Units on disk ──

#[test]
fn json_units_run_in_parallel_and_keep_order() {
    let root = fixture_root();
    let units = vec![
        root.join("fields.ast.json"),
        root.join("malformed.ast.json"),
        root.join("missing.ast.json"),
    ];
    let engine = Engine::builder()
        .rule(VectorField::new())
        .parallelism(2)
        .build()
        .expect("engine should build");
    let report = engine.run_units(&units);

    assert_eq!(report.units.len(), 3);
    assert_eq!(report.units[0].unit, units[0]);
    assert!(report.units[0].failure.is_none());
    assert_eq!(report.units[0].diagnostics.len(), 1);
    assert_eq!(report.units[0].diagnostics[0].location.line, 3);
    assert!(report.units[1].failure.is_some());
    assert!(report.units[2].failure.is_some());
    assert!(report.has_errors());
}

#[test]
fn inconsistent_dumps_fail_alone() {
    let root = fixture_root();
    let units = vec![
        root.join("dangling_decl.ast.json"),
        root.join("fields.ast.json"),
        root.join("node_cycle.ast.json"),
    ];
    let engine = Engine::builder()
        .rule(VectorField::new())
        .build()
        .expect("engine should build");
    let report = engine.run_units(&units);

    assert_eq!(report.units.len(), 3);
    let failure = report.units[0].failure.as_deref().unwrap_or_default();
    assert!(failure.contains("record declaration"), "{failure}");
    assert!(report.units[1].failure.is_none());
    assert_eq!(report.units[1].diagnostics.len(), 1);
    let failure = report.units[2].failure.as_deref().unwrap_or_default();
    assert!(failure.contains("cycle"), "{failure}");
}

#[test]
fn unknown_rule_ids_and_missing_lists_are_warnings() {
    let config = policy_lint_core::Config::parse(
        r#"
[engine]
enabled_rules = ["vector-field", "no-such-rule"]

[[exclusion_lists]]
kind = "paths"
file = "/nonexistent/paths.txt"
"#,
    )
    .expect("config should parse");
    let engine = Engine::builder()
        .rule(VectorField::new())
        .rule(BadCast::new())
        .config(config)
        .build()
        .expect("engine should build");

    assert_eq!(engine.rule_names(), vec!["vector-field"]);
    assert_eq!(engine.warnings().len(), 2);
}

#[test]
fn file_level_source_data_round_trips_through_json() {
    let file = SourceFile::from_text("a.h", "x\n").with_pragma("check_unsafe_buffers");
    let json = serde_json::to_string(&file).expect("serializable");
    assert!(json.contains("check_unsafe_buffers"));
}
