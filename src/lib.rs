//! TreeReader - Pull-style cursor over an in-memory element tree
//!
//! Layers:
//! - `dom`: arena element tree, builder and the `TreeAccess` contract
//! - `cursor`: the forward-only cursor state machine and event iterator
//! - `resource` / `term`: BEAM resources and term conversion for the NIFs

use rustler::{Env, NifResult, ResourceArc, Term};
use tracing::debug;

pub mod cursor;
pub mod dom;
mod resource;
mod term;

use dom::NodeId;
use resource::{CursorRef, CursorResource, TreeRef, TreeResource};
use term::{build_error_reply, node_to_term, reply, state_to_atom};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    pub static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

    pub struct TrackingAllocator;

    #[cfg(feature = "mimalloc")]
    static UNDERLYING: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static UNDERLYING: std::alloc::System = std::alloc::System;

    unsafe impl GlobalAlloc for TrackingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = UNDERLYING.alloc(layout);
            if !ptr.is_null() {
                let current = ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
                PEAK_ALLOCATED.fetch_max(current, Ordering::Relaxed);
            }
            ptr
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
            UNDERLYING.dealloc(ptr, layout)
        }
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::TrackingAllocator = tracking::TrackingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Memory Tracking NIFs
// ============================================================================

#[cfg(feature = "memory_tracking")]
use std::sync::atomic::Ordering;

#[cfg(feature = "memory_tracking")]
#[rustler::nif]
fn get_rust_memory() -> usize {
    tracking::ALLOCATED.load(Ordering::SeqCst)
}

#[cfg(feature = "memory_tracking")]
#[rustler::nif]
fn get_rust_memory_peak() -> usize {
    tracking::PEAK_ALLOCATED.load(Ordering::SeqCst)
}

#[cfg(feature = "memory_tracking")]
#[rustler::nif]
fn reset_rust_memory_stats() -> (usize, usize) {
    let current = tracking::ALLOCATED.load(Ordering::SeqCst);
    let peak = tracking::PEAK_ALLOCATED.swap(current, Ordering::SeqCst);
    (current, peak)
}

#[cfg(not(feature = "memory_tracking"))]
#[rustler::nif]
fn get_rust_memory() -> usize {
    0
}

#[cfg(not(feature = "memory_tracking"))]
#[rustler::nif]
fn get_rust_memory_peak() -> usize {
    0
}

#[cfg(not(feature = "memory_tracking"))]
#[rustler::nif]
fn reset_rust_memory_stats() -> (usize, usize) {
    (0, 0)
}

// ============================================================================
// Trees
// ============================================================================

/// Build a tree from nested node terms (returns {:ok, tree} or {:error, {reason, message}})
#[rustler::nif]
fn tree_from_term<'a>(env: Env<'a>, input: Term<'a>) -> NifResult<Term<'a>> {
    match term::term_to_tree(input) {
        Ok(tree) => {
            debug!(nodes = tree.node_count(), "tree built from term");
            let resource = ResourceArc::new(TreeResource::new(tree));
            reply(env, Ok(resource))
        }
        Err(e) => {
            debug!(reason = e.reason(), "tree term rejected");
            build_error_reply(env, &e)
        }
    }
}

/// Number of nodes in a tree
#[rustler::nif]
fn tree_node_count(tree: TreeRef) -> usize {
    tree.tree.node_count()
}

// ============================================================================
// Cursors
// ============================================================================

/// Create a cursor rooted at `root`, or at the first top-level element when nil
#[rustler::nif]
fn cursor_new<'a>(env: Env<'a>, tree: TreeRef, root: Option<NodeId>, include_misc_nodes: bool) -> NifResult<Term<'a>> {
    let result = CursorResource::new(&tree, root, include_misc_nodes)
        .map(ResourceArc::new)
        .map_err(|e| e.reason());
    reply(env, result)
}

#[rustler::nif]
fn cursor_advance<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(env, cursor.with_cursor(|c| c.advance()))
}

#[rustler::nif]
fn cursor_descend<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(env, cursor.with_cursor(|c| c.descend()))
}

#[rustler::nif]
fn cursor_move_to_sibling<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(env, cursor.with_cursor(|c| c.move_to_sibling()))
}

/// Skip the current subtree; replies with the new state
#[rustler::nif]
fn cursor_skip_subtree<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(
        env,
        cursor.with_cursor(|c| {
            c.skip_subtree()?;
            Ok(state_to_atom(c.state()))
        }),
    )
}

/// Consume the current node; replies with its subtree as a term
#[rustler::nif]
fn cursor_load_current_node<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(
        env,
        cursor.with_cursor(|c| {
            let id = c.load_current_node()?;
            Ok(node_to_term(env, c.tree()?, id))
        }),
    )
}

#[rustler::nif]
fn cursor_state<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(env, cursor.with_cursor(|c| Ok(state_to_atom(c.state()))))
}

#[rustler::nif]
fn cursor_depth<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(env, cursor.with_cursor(|c| c.depth()))
}

#[rustler::nif]
fn cursor_local_name<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(env, cursor.with_cursor(|c| c.local_name().map(str::to_string)))
}

#[rustler::nif]
fn cursor_namespace_uri<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(env, cursor.with_cursor(|c| Ok(c.namespace_uri()?.map(str::to_string))))
}

#[rustler::nif]
fn cursor_prefix<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(env, cursor.with_cursor(|c| Ok(c.prefix()?.map(str::to_string))))
}

/// Attributes as [{qualified_name, value}]
#[rustler::nif]
fn cursor_attributes<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(
        env,
        cursor.with_cursor(|c| {
            Ok(c.attribute_values()?
                .into_iter()
                .map(|(name, value)| (name.into_owned(), value.to_string()))
                .collect::<Vec<_>>())
        }),
    )
}

/// Namespace declarations as [{prefix, uri}], "" for the default namespace
#[rustler::nif]
fn cursor_namespace_declarations<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(
        env,
        cursor.with_cursor(|c| {
            Ok(c.namespace_bindings()?
                .into_iter()
                .map(|(prefix, uri)| (prefix.to_string(), uri.to_string()))
                .collect::<Vec<_>>())
        }),
    )
}

#[rustler::nif]
fn cursor_text<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(env, cursor.with_cursor(|c| c.text().map(str::to_string)))
}

/// Close the cursor; idempotent
#[rustler::nif]
fn cursor_close<'a>(env: Env<'a>, cursor: CursorRef) -> NifResult<Term<'a>> {
    reply(
        env,
        cursor.with_cursor(|c| {
            c.close();
            Ok(state_to_atom(c.state()))
        }),
    )
}

// ============================================================================
// NIF Initialization
// ============================================================================

rustler::init!("Elixir.TreeReader.Native");
