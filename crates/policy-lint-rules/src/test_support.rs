//! Shared helpers for rule tests.

use policy_lint_core::testing::{loc, macro_range, range, TreeBuilder};
use policy_lint_core::{
    Engine, Node, NodeKind, Rule, RunReport, SpecifierKind, SyntaxTree, UnitReport,
};

/// Byte offset of `needle` in a fixture text.
pub(crate) fn at(text: &str, needle: &str) -> u32 {
    let offset = text.find(needle).expect("needle in fixture text");
    u32::try_from(offset).expect("small fixture")
}

/// Runs one rule over a tree.
pub(crate) fn run<R: Rule + 'static>(rule: R, tree: &SyntaxTree) -> UnitReport {
    Engine::builder()
        .rule(rule)
        .build()
        .expect("engine should build")
        .run_tree(tree)
}

/// Runs one rule in rewrite mode and renders the resulting edit script.
pub(crate) fn rewrite<R: Rule + 'static>(rule: R, tree: &SyntaxTree) -> String {
    let unit = Engine::builder()
        .rule(rule)
        .rewrite(true)
        .build()
        .expect("engine should build")
        .run_tree(tree);
    let mut report = RunReport::new();
    report.units.push(unit);
    report.edit_script().render()
}

/// `(line, column)` of every diagnostic in order.
pub(crate) fn positions(report: &UnitReport) -> Vec<(u32, u32)> {
    report
        .diagnostics
        .iter()
        .map(|d| (d.location.line, d.location.column))
        .collect()
}

/// Classes exercising `virtual`/`override`/`final` combinations.
pub(crate) const VIRTUAL_TEXT: &str = "\
#define OVERRIDE override
class Base {
 public:
  virtual void F() = 0;
};
class MissingOverride : public Base {
 public:
  void F() {}
};
class VirtualAndOverride : public Base {
 public:
  virtual void F() override {}
};
class VirtualAndFinal : public Base {
 public:
  virtual void F() final {}
};
class OverrideAndFinal : public Base {
 public:
  void F() override final {}
};
class VirtualAndMacroOverride : public Base {
 public:
  virtual void F() OVERRIDE {}
};
class MacroOverrideAndFinal : public Base {
 public:
  void F() OVERRIDE final {}
};
";

/// One record per `class` line of [`VIRTUAL_TEXT`], each holding its `F`.
pub(crate) fn virtual_fixture() -> SyntaxTree {
    let mut b = TreeBuilder::new("virtual.h");
    let f = b.file_with_text("virtual.h", VIRTUAL_TEXT);
    let macro_body = at(VIRTUAL_TEXT, "override");

    let mut record = b.root();
    let mut record_name = "";
    let mut line_start = 0u32;
    for line in VIRTUAL_TEXT.lines() {
        let len = u32::try_from(line.len()).expect("short line");
        let offset = |col: usize| line_start + u32::try_from(col).expect("short line");

        if let Some(name) = line
            .strip_prefix("class ")
            .and_then(|rest| rest.split_whitespace().next())
        {
            record_name = name;
            record = b.node(
                b.root(),
                Node::new(NodeKind::Record, range(f, line_start, line_start + len)).named(name),
            );
        } else if let Some(paren) = line.find("F()") {
            let mut method = Node::new(NodeKind::Method, range(f, line_start + 2, line_start + len))
                .named(format!("{record_name}::F"))
                .with_declarator_end(loc(f, offset(paren + 3)));
            if record_name != "Base" {
                method = method.overriding();
            }
            for (keyword, kind) in [
                ("virtual", SpecifierKind::Virtual),
                ("override", SpecifierKind::Override),
                ("final", SpecifierKind::Final),
            ] {
                if let Some(col) = line.find(keyword) {
                    let end = offset(col + keyword.len());
                    method = method.with_specifier(kind, range(f, offset(col), end));
                }
            }
            if let Some(col) = line.find("OVERRIDE") {
                let invocation = range(f, offset(col), offset(col + 8));
                let e = b.expansion("OVERRIDE", loc(f, macro_body), invocation);
                method = method.with_specifier(SpecifierKind::Override, macro_range(e, 0, 8));
            }
            b.node(record, method);
        }
        line_start += len + 1;
    }
    b.build()
}
