//! Serializers for parsed documents
//!
//! All three writers produce entity-masked output and unmark it once at the
//! end, so entities the author typed come out exactly as written.

use super::entities::{decode_entities, encode_attribute, encode_text, unmark_entities};
use super::html::HtmlPolicy;
use super::parser::{Document, Node, TagNode};
use super::tags::{named, parse_dimension, parse_size, value_of, BbTag};

const SPOILER_OPEN: &str = "Show";
const SPOILER_CLOSE: &str = "Hide";

impl Document {
    fn policy(&self) -> HtmlPolicy {
        HtmlPolicy::new(self.options.keep_html_tags)
    }

    /// Safe markup: canonical bracket tags, filtered HTML, encoded text.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_markup(&self.nodes, self.policy(), &mut out);
        unmark_entities(&out)
    }

    /// HTML for display, one element per recognized tag.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_html(&self.nodes, self.policy(), &mut out);
        unmark_entities(&out)
    }

    /// The text a reader would see, with entities decoded.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        write_plain(&self.nodes, &mut out);
        decode_entities(&unmark_entities(&out))
    }
}

fn write_markup(nodes: &[Node], policy: HtmlPolicy, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => encode_text(text, out),
            Node::Html(tag) => policy.write(tag, out),
            Node::Tag(node) => {
                out.push('[');
                out.push_str(node.name());
                for attr in &node.attrs {
                    let mut value = String::new();
                    encode_attribute(&attr.value, &mut value);
                    if attr.is_value() {
                        out.push('=');
                        if value.contains(']') {
                            out.push('"');
                            out.push_str(&value);
                            out.push('"');
                        } else {
                            out.push_str(&value);
                        }
                    } else {
                        out.push(' ');
                        out.push_str(&attr.name);
                        out.push_str("=\"");
                        out.push_str(&value);
                        out.push('"');
                    }
                }
                out.push(']');
                write_markup(&node.children, policy, out);
                out.push_str("[/");
                out.push_str(node.name());
                out.push(']');
            }
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    encode_attribute(value, out);
    out.push('"');
}

fn write_styled(node: &TagNode, element: &str, style: &str, policy: HtmlPolicy, out: &mut String) {
    out.push('<');
    out.push_str(element);
    push_attr(out, "style", style);
    out.push('>');
    write_html(&node.children, policy, out);
    out.push_str("</");
    out.push_str(element);
    out.push('>');
}

fn write_wrapped(node: &TagNode, element: &str, policy: HtmlPolicy, out: &mut String) {
    out.push('<');
    out.push_str(element);
    out.push('>');
    write_html(&node.children, policy, out);
    out.push_str("</");
    out.push_str(element);
    out.push('>');
}

fn write_html(nodes: &[Node], policy: HtmlPolicy, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => encode_text(text, out),
            Node::Html(tag) => policy.write(tag, out),
            Node::Tag(node) => write_tag_html(node, policy, out),
        }
    }
}

fn write_tag_html(node: &TagNode, policy: HtmlPolicy, out: &mut String) {
    let value = value_of(&node.attrs).map(str::trim).unwrap_or_default();

    match node.tag {
        BbTag::Bold => write_wrapped(node, "b", policy, out),
        BbTag::Italic => write_wrapped(node, "i", policy, out),
        BbTag::Underline => write_wrapped(node, "u", policy, out),
        BbTag::Strike => write_wrapped(node, "s", policy, out),
        BbTag::Div => write_wrapped(node, "div", policy, out),
        BbTag::Color => write_styled(node, "span", &format!("color: {value};"), policy, out),
        BbTag::Background => {
            write_styled(node, "span", &format!("background-color: {value};"), policy, out)
        }
        BbTag::Size => {
            let size = parse_size(value).unwrap_or(14);
            write_styled(node, "span", &format!("font-size: {size}px;"), policy, out)
        }
        BbTag::Font => write_styled(node, "span", &format!("font-family: {value};"), policy, out),
        BbTag::Left => write_styled(node, "div", "text-align: left;", policy, out),
        BbTag::Center => write_styled(node, "div", "text-align: center;", policy, out),
        BbTag::Right => write_styled(node, "div", "text-align: right;", policy, out),
        BbTag::Justify => write_styled(node, "div", "text-align: justify;", policy, out),
        BbTag::Url => {
            let href = if value.is_empty() {
                node.text_content().unwrap_or_default()
            } else {
                value
            };
            out.push_str("<a");
            push_attr(out, "href", href);
            out.push_str(" target=\"_blank\" rel=\"noopener noreferrer\">");
            write_html(&node.children, policy, out);
            out.push_str("</a>");
        }
        BbTag::Alt => {
            out.push_str("<span");
            push_attr(out, "title", value);
            out.push('>');
            write_html(&node.children, policy, out);
            out.push_str("</span>");
        }
        BbTag::Img => {
            out.push_str("<img");
            push_attr(out, "src", node.text_content().unwrap_or_default());
            for name in ["width", "height"] {
                if let Some(px) = named(&node.attrs, name).and_then(parse_dimension) {
                    push_attr(out, name, &px.to_string());
                }
            }
            out.push('>');
        }
        BbTag::Spoiler => {
            let open = named(&node.attrs, "open").unwrap_or(SPOILER_OPEN);
            let close = named(&node.attrs, "close").unwrap_or(SPOILER_CLOSE);
            out.push_str("<div class=\"spoiler\"><button type=\"button\"");
            push_attr(out, "data-open", open);
            push_attr(out, "data-close", close);
            out.push('>');
            encode_text(open, out);
            out.push_str("</button><div class=\"spoiler-content\">");
            write_html(&node.children, policy, out);
            out.push_str("</div></div>");
        }
        BbTag::Raw => write_html(&node.children, policy, out),
    }
}

fn write_plain(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Html(_) => {}
            Node::Tag(node) if node.tag == BbTag::Img => {}
            Node::Tag(node) => write_plain(&node.children, out),
        }
    }
}
