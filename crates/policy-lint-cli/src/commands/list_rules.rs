//! List rules command implementation.

use policy_lint_rules::all_rules;

/// Runs the list-rules command.
pub fn run() {
    println!("Available rules:\n");
    println!("{:<10} {:<28} {:<8} Description", "Code", "Name", "Rewrite");
    println!("{}", "-".repeat(90));

    for rule in all_rules() {
        println!(
            "{:<10} {:<28} {:<8} {}",
            rule.code(),
            rule.name(),
            if rule.supports_rewrite() { "yes" } else { "" },
            rule.description()
        );
    }

    println!("\nPresets:");
    println!("  all      - every rule (default)");
    println!("  raw-ptr  - PL001-PL004");
    println!("  style    - PL005-PL009");
    println!("  rewrite  - rules that offer rewrites");

    println!("\nUse --rules to filter specific rules, e.g.:");
    println!("  policy-lint check --rules raw-ptr-field,unsafe-buffers");
    println!("  policy-lint check --rules PL001,PL006");
}
