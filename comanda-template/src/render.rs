//! Template renderer
//!
//! Walks a compiled template against a [`ReceiptContext`] and produces
//! the neutral directive sequence. Rendering is infallible: unknown
//! placeholders and collections resolve to nothing, and the sequence
//! always ends with a cut.

use shared::print::{Directive, DirectiveSequence};
use tracing::debug;

use crate::compiler::{CompiledTemplate, Node};
use crate::context::{ItemFields, OptionFields, PaymentFields, ReceiptContext};

/// Innermost-first scope chain entry
enum Scope<'a> {
    Item(&'a ItemFields),
    Option(&'a OptionFields),
    Payment(&'a PaymentFields),
}

impl<'a> Scope<'a> {
    fn field(&self, key: &str) -> Option<&'a str> {
        match self {
            Scope::Item(f) => f.field(key),
            Scope::Option(f) => f.field(key),
            Scope::Payment(f) => f.field(key),
        }
    }
}

/// Render a compiled template bound to one order's context
pub fn render(template: &CompiledTemplate, ctx: &ReceiptContext) -> DirectiveSequence {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut stack: Vec<Scope> = Vec::new();

    walk(template.nodes(), ctx, &mut stack, &mut buf, &mut out);

    flush(&mut buf, &mut out);
    out.push(Directive::Cut);
    out
}

fn walk<'a>(
    nodes: &'a [Node],
    ctx: &'a ReceiptContext,
    stack: &mut Vec<Scope<'a>>,
    buf: &mut String,
    out: &mut DirectiveSequence,
) {
    for node in nodes {
        match node {
            Node::Literal(text) => buf.push_str(text),

            Node::Scalar(key) => buf.push_str(resolve(key, stack, ctx)),

            Node::Qr(key) => {
                let payload = resolve(key, stack, ctx);
                flush(buf, out);
                // An order without a QR payload simply prints no code
                if !payload.is_empty() {
                    out.push(Directive::Qr(payload.to_string()));
                }
            }

            Node::If { key, body } => {
                if truthy(resolve(key, stack, ctx)) {
                    walk(body, ctx, stack, buf, out);
                }
            }

            Node::Each { collection, body } => match collection.as_str() {
                "items" => {
                    for item in &ctx.items {
                        stack.push(Scope::Item(item));
                        walk(body, ctx, stack, buf, out);
                        stack.pop();
                    }
                }
                "item_options" => {
                    for option in innermost_item_options(stack) {
                        stack.push(Scope::Option(option));
                        walk(body, ctx, stack, buf, out);
                        stack.pop();
                    }
                }
                "payments" => {
                    for payment in &ctx.payments {
                        stack.push(Scope::Payment(payment));
                        walk(body, ctx, stack, buf, out);
                        stack.pop();
                    }
                }
                other => {
                    debug!(collection = other, "unknown collection in template");
                }
            },
        }
    }
}

/// Resolve a key innermost scope first, then the order scope.
/// Unknown keys resolve to the empty string, never an error.
fn resolve<'a>(key: &str, stack: &[Scope<'a>], ctx: &'a ReceiptContext) -> &'a str {
    for scope in stack.iter().rev() {
        if let Some(v) = scope.field(key) {
            return v;
        }
    }
    ctx.order_field(key).unwrap_or_default()
}

fn innermost_item_options<'a>(stack: &[Scope<'a>]) -> &'a [OptionFields] {
    stack
        .iter()
        .rev()
        .find_map(|scope| match scope {
            Scope::Item(item) => Some(&item.options[..]),
            _ => None,
        })
        .unwrap_or(&[])
}

/// Empty strings and zero amounts are falsy, matching how zero fees and
/// discounts format to the empty string in the binding context.
fn truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && value != "0.00"
}

/// Emit the buffered text as line directives
fn flush(buf: &mut String, out: &mut DirectiveSequence) {
    if buf.is_empty() {
        return;
    }
    let ends_with_newline = buf.ends_with('\n');
    let mut lines: Vec<&str> = buf.split('\n').collect();
    if ends_with_newline {
        lines.pop();
    }
    out.extend(lines.into_iter().map(|l| Directive::Text(l.to_string())));
    buf.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StoreInfo;
    use shared::order::Order;

    fn ctx(json: &str) -> ReceiptContext {
        let order: Order = serde_json::from_str(json).unwrap();
        ReceiptContext::new(&order, &StoreInfo::default())
    }

    fn text_of(seq: &DirectiveSequence) -> String {
        seq.iter()
            .filter_map(|d| match d {
                Directive::Text(l) => Some(l.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let tpl = CompiledTemplate::compile("[{{customer_phone}}][{{nonexistent}}]").unwrap();
        let seq = render(&tpl, &ctx(r#"{"id": "o1"}"#));
        assert_eq!(seq[0], Directive::Text("[][]".to_string()));
        assert_eq!(seq.last(), Some(&Directive::Cut));
    }

    #[test]
    fn test_each_items_in_order_no_separator() {
        let tpl = CompiledTemplate::compile("{{#each items}}{{item_name}}{{/each}}").unwrap();
        let seq = render(
            &tpl,
            &ctx(r#"{"id": "o1", "items": [{"name": "A"}, {"name": "B"}]}"#),
        );
        assert_eq!(seq[0], Directive::Text("AB".to_string()));
    }

    #[test]
    fn test_nested_options_render_per_item_in_sequence() {
        let tpl = CompiledTemplate::compile(
            "{{#each items}}{{item_name}}:{{#each item_options}}{{option_name}},{{/each}};{{/each}}",
        )
        .unwrap();
        let seq = render(
            &tpl,
            &ctx(
                r#"{"id": "o1", "items": [
                    {"name": "A", "options": [{"name": "a1"}, {"name": "a2"}]},
                    {"name": "B", "options": [{"name": "b1"}]}
                ]}"#,
            ),
        );
        assert_eq!(seq[0], Directive::Text("A:a1,a2,;B:b1,;".to_string()));
    }

    #[test]
    fn test_outer_scope_visible_inside_block() {
        let tpl =
            CompiledTemplate::compile("{{#each items}}{{display_id}}/{{item_name}} {{/each}}")
                .unwrap();
        let seq = render(
            &tpl,
            &ctx(r#"{"id": "o1", "displayId": "7", "items": [{"name": "A"}]}"#),
        );
        assert_eq!(seq[0], Directive::Text("07/A ".to_string()));
    }

    #[test]
    fn test_payments_block() {
        let tpl =
            CompiledTemplate::compile("{{#each payments}}{{payment_method}} {{payment_value}}\n{{/each}}")
                .unwrap();
        let seq = render(
            &tpl,
            &ctx(r#"{"id": "o1", "payments": [{"method": "cash", "value": 12.5}]}"#),
        );
        assert_eq!(seq[0], Directive::Text("CASH 12.50".to_string()));
    }

    #[test]
    fn test_qr_resolves_to_directive() {
        let tpl = CompiledTemplate::compile("a\n[QR:{{qr_url}}]\nb\n").unwrap();
        let seq = render(&tpl, &ctx(r#"{"id": "o1", "qrText": "http://x/o1"}"#));
        assert_eq!(
            seq,
            vec![
                Directive::Text("a".to_string()),
                Directive::Qr("http://x/o1".to_string()),
                Directive::Text("b".to_string()),
                Directive::Cut,
            ]
        );
    }

    #[test]
    fn test_qr_without_payload_is_skipped() {
        let tpl = CompiledTemplate::compile("a\n[QR:{{qr_url}}]\nb\n").unwrap();
        let seq = render(&tpl, &ctx(r#"{"id": "o1"}"#));
        assert!(seq.iter().all(|d| !matches!(d, Directive::Qr(_))));
    }

    #[test]
    fn test_if_block_truthiness() {
        let tpl =
            CompiledTemplate::compile("{{#if delivery_fee}}fee:{{delivery_fee}}{{/if}}end").unwrap();

        // Zero fee formats to the empty string, so the block is suppressed
        let seq = render(&tpl, &ctx(r#"{"id": "o1", "deliveryFee": 0}"#));
        assert_eq!(text_of(&seq), "end");

        let seq = render(&tpl, &ctx(r#"{"id": "o1", "deliveryFee": 5}"#));
        assert_eq!(text_of(&seq), "fee:5.00end");
    }

    #[test]
    fn test_item_note_conditional() {
        let tpl = CompiledTemplate::compile(
            "{{#each items}}{{item_name}}{{#if item_note}}({{item_note}}){{/if}}{{/each}}",
        )
        .unwrap();
        let seq = render(
            &tpl,
            &ctx(r#"{"id": "o1", "items": [{"name": "A", "note": "hot"}, {"name": "B"}]}"#),
        );
        assert_eq!(seq[0], Directive::Text("A(hot)B".to_string()));
    }

    #[test]
    fn test_default_template_end_to_end() {
        let tpl = CompiledTemplate::compile(crate::DEFAULT_TEMPLATE).unwrap();
        let seq = render(
            &tpl,
            &ctx(
                r#"{"id": "o1", "items": [{"name": "X", "quantity": 2, "price": 20}],
                    "total": 20, "qrText": "http://x/o1"}"#,
            ),
        );

        let text = text_of(&seq);
        assert!(text.contains("2x X"), "item line missing in:\n{}", text);
        assert!(text.contains("20.00"), "price missing in:\n{}", text);
        assert!(seq.contains(&Directive::Qr("http://x/o1".to_string())));
        assert_eq!(seq.last(), Some(&Directive::Cut));

        // Suppressed {{#if}} lines leave no blank lines behind
        assert!(!text.contains("Delivery fee"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let tpl = CompiledTemplate::compile(crate::DEFAULT_TEMPLATE).unwrap();
        let c = ctx(r#"{"id": "o1", "items": [{"name": "X"}], "total": 10}"#);
        assert_eq!(render(&tpl, &c), render(&tpl, &c));
    }
}
