//! Elixir Term Conversion Utilities
//!
//! Converts nested Elixir terms into element trees and tree nodes back
//! into terms. The shape is the same in both directions:
//!
//! - `{:element, name, [{name, value}], children}`
//! - a binary for text
//! - `{:comment, text}`
//! - `{:pi, target}` or `{:pi, target, data}`

use rustler::types::tuple::get_tuple;
use rustler::{Atom, Encoder, Env, NewBinary, NifResult, Term};

use crate::cursor::CursorState;
use crate::dom::{fold_subtree, BuildError, ElementTree, MiscKind, NodeId, NodeKind, TreeAccess, TreeBuilder};

// Pre-defined atoms for efficiency - created once at compile time
rustler::atoms! {
    ok,
    error,
    element,
    comment,
    pi,
    null,
    start,
    leaf_start,
    end,
    misc_node,
    eof,
}

// ============================================================================
// Term -> Tree
// ============================================================================

/// Work left while walking the input term
enum Pending<'a> {
    Node(Term<'a>),
    Close,
}

/// Build a tree from a node term or a list of top-level node terms.
/// Nested terms are walked with an explicit stack.
pub fn term_to_tree(term: Term<'_>) -> Result<ElementTree, BuildError> {
    let mut builder = TreeBuilder::new();
    let mut work = Vec::new();
    if term.is_list() {
        let items: Vec<Term> = term
            .decode()
            .map_err(|_| BuildError::InvalidTerm("expected a proper list"))?;
        work.extend(items.into_iter().rev().map(Pending::Node));
    } else {
        work.push(Pending::Node(term));
    }

    while let Some(next) = work.pop() {
        match next {
            Pending::Node(node) => add_node(&mut builder, node, &mut work)?,
            Pending::Close => {
                builder.end_element()?;
            }
        }
    }
    builder.finish()
}

fn decode_string(term: Term<'_>, what: &'static str) -> Result<String, BuildError> {
    term.decode::<String>().map_err(|_| BuildError::InvalidTerm(what))
}

fn add_node<'a>(builder: &mut TreeBuilder, term: Term<'a>, work: &mut Vec<Pending<'a>>) -> Result<(), BuildError> {
    if term.is_binary() {
        builder.text(&decode_string(term, "text must be UTF-8")?);
        return Ok(());
    }

    let parts = get_tuple(term).map_err(|_| BuildError::InvalidTerm("expected a tuple or binary"))?;
    let tag: Atom = parts
        .first()
        .and_then(|t| t.decode().ok())
        .ok_or(BuildError::InvalidTerm("node tuple must start with an atom"))?;

    match parts.len() {
        4 if tag == element() => add_element(builder, &parts[1..], work),
        2 if tag == comment() => {
            builder.comment(&decode_string(parts[1], "comment must be a binary")?);
            Ok(())
        }
        2 | 3 if tag == pi() => {
            let target = decode_string(parts[1], "pi target must be a binary")?;
            let data = match parts.get(2) {
                Some(&d) => Some(decode_string(d, "pi data must be a binary")?),
                None => None,
            };
            builder.processing_instruction(&target, data.as_deref())?;
            Ok(())
        }
        _ => Err(BuildError::InvalidTerm("unknown node tuple")),
    }
}

fn add_element<'a>(builder: &mut TreeBuilder, parts: &[Term<'a>], work: &mut Vec<Pending<'a>>) -> Result<(), BuildError> {
    let name = decode_string(parts[0], "element name must be a binary")?;
    let attrs: Vec<(String, String)> = parts[1]
        .decode()
        .map_err(|_| BuildError::InvalidTerm("attributes must be {name, value} binaries"))?;
    let children: Vec<Term<'a>> = parts[2]
        .decode()
        .map_err(|_| BuildError::InvalidTerm("children must be a list"))?;

    let attr_refs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    // Sole text child: keep it inline
    if let [only] = children.as_slice() {
        if only.is_binary() {
            let text = decode_string(*only, "text must be UTF-8")?;
            builder.leaf_text_element(&name, &attr_refs, &text)?;
            return Ok(());
        }
    }

    builder.start_element(&name, &attr_refs)?;
    work.push(Pending::Close);
    work.extend(children.into_iter().rev().map(Pending::Node));
    Ok(())
}

// ============================================================================
// Tree -> Term
// ============================================================================

fn qualified_name<D: TreeAccess>(tree: &D, id: NodeId) -> String {
    match tree.prefix(id) {
        Some(prefix) => format!("{}:{}", prefix, tree.local_name(id)),
        None => tree.local_name(id).to_string(),
    }
}

/// Convert a node and its subtree to an Elixir term
pub fn node_to_term<'a, D: TreeAccess>(env: Env<'a>, tree: &D, id: NodeId) -> Term<'a> {
    fold_subtree(tree, id, |node, children| single_node_term(env, tree, node, children))
}

/// Term for one node, given the terms of its children
fn single_node_term<'a, D: TreeAccess>(env: Env<'a>, tree: &D, id: NodeId, children: Vec<Term<'a>>) -> Term<'a> {
    match tree.kind(id) {
        NodeKind::Element => element_term(env, tree, id, children.encode(env)),
        NodeKind::LeafTextElement => {
            let mut content = Term::list_new_empty(env);
            let text = tree.text(id).unwrap_or("");
            if !text.is_empty() {
                content = content.list_prepend(str_to_binary(env, text));
            }
            element_term(env, tree, id, content)
        }
        NodeKind::Misc(MiscKind::Text) => str_to_binary(env, tree.text(id).unwrap_or("")),
        NodeKind::Misc(MiscKind::Comment) => {
            (comment(), str_to_binary(env, tree.text(id).unwrap_or(""))).encode(env)
        }
        NodeKind::Misc(MiscKind::ProcessingInstruction) => {
            let target = str_to_binary(env, tree.local_name(id));
            match tree.text(id) {
                Some(data) => (pi(), target, str_to_binary(env, data)).encode(env),
                None => (pi(), target).encode(env),
            }
        }
    }
}

fn element_term<'a, D: TreeAccess>(env: Env<'a>, tree: &D, id: NodeId, children: Term<'a>) -> Term<'a> {
    let name_term = str_to_binary(env, &qualified_name(tree, id));

    // Namespace declarations go back out as xmlns attributes, ahead of the rest
    let mut pairs: Vec<(String, &str)> = tree
        .namespace_declarations(id)
        .iter()
        .map(|decl| {
            let name = match decl.prefix_id {
                0 => "xmlns".to_string(),
                p => format!("xmlns:{}", tree.string(p)),
            };
            (name, tree.string(decl.uri_id))
        })
        .collect();
    for attr in tree.attributes(id) {
        let local = tree.string(attr.name_id);
        let name = match attr.prefix_id {
            0 => local.to_string(),
            p => format!("{}:{}", tree.string(p), local),
        };
        pairs.push((name, tree.string(attr.value_id)));
    }

    let mut attrs = Term::list_new_empty(env);
    for (name, value) in pairs.iter().rev() {
        let attr_tuple = (str_to_binary(env, name), str_to_binary(env, value));
        attrs = attrs.list_prepend(attr_tuple.encode(env));
    }

    (element(), name_term, attrs, children).encode(env)
}

/// Atom naming a cursor state
pub fn state_to_atom(state: CursorState) -> Atom {
    match state {
        CursorState::Null => null(),
        CursorState::Start => start(),
        CursorState::LeafStart => leaf_start(),
        CursorState::End => end(),
        CursorState::MiscNode => misc_node(),
        CursorState::Eof => eof(),
    }
}

/// `{:ok, value}` or `{:error, reason}`
pub fn reply<'a, T: Encoder>(env: Env<'a>, result: Result<T, &'static str>) -> NifResult<Term<'a>> {
    match result {
        Ok(value) => Ok((ok(), value).encode(env)),
        Err(reason) => error_reply(env, reason),
    }
}

/// `{:error, reason}` with the reason as an atom
pub fn error_reply<'a>(env: Env<'a>, reason: &str) -> NifResult<Term<'a>> {
    let reason_atom = Atom::from_str(env, reason)?;
    Ok((error(), reason_atom).encode(env))
}

/// `{:error, {reason, message}}` for a rejected tree term
pub fn build_error_reply<'a>(env: Env<'a>, err: &BuildError) -> NifResult<Term<'a>> {
    let reason_atom = Atom::from_str(env, err.reason())?;
    Ok((error(), (reason_atom, err.to_string())).encode(env))
}

/// Convert a string to a binary term (more efficient than .encode())
#[inline]
fn str_to_binary<'a>(env: Env<'a>, s: &str) -> Term<'a> {
    let bytes = s.as_bytes();
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}
