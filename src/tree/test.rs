// Tests for raw parse tree views
//
//  Copyright (C) 2023 The synbind contributors.
//
//  This file is part of synbind.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

use super::*;

// selectStmt
// |- columnList
// |  |- columnRef "a"
// |  `- columnRef "b"
// `- columnRef "c"
fn select_tree() -> SourceTree {
    SourceTree::build("selectStmt", |b| {
        b.rule("columnList", |b| {
            b.leaf("columnRef", "a");
            b.leaf("columnRef", "b");
        });
        b.leaf("columnRef", "c");
    })
}

// A tree where matches are nested beneath matches:
//
// root
// |- item
// |  |- item "x"
// |  `- other "y"
// `- wrap
//    `- item "z"
fn nested_tree() -> SourceTree {
    SourceTree::build("root", |b| {
        b.rule("item", |b| {
            b.leaf("item", "x");
            b.leaf("other", "y");
        });
        b.rule("wrap", |b| {
            b.leaf("item", "z");
        });
    })
}

fn texts<R: RawTree>(view: &TreeView<R>, nodes: &[NodeId]) -> Vec<String> {
    nodes.iter().map(|&n| view.text(n).to_string()).collect()
}

#[test]
fn only_root_materialized_initially() {
    let tree = select_tree();
    let view = TreeView::new(&tree);

    assert_eq!(1, view.len());
    assert_eq!("selectStmt", &*view.name(view.root()));
    assert_eq!(None, view.parent(view.root()));
}

#[test]
fn children_materialized_once() {
    let tree = select_tree();
    let view = TreeView::new(&tree);
    let root = view.root();

    let first = view.children(root);
    assert_eq!(3, view.len());

    let second = view.children(root);
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(3, view.len());

    assert_eq!(Some(root), view.parent(first[1]));
    assert_eq!(1, view.sibling_index(first[1]));
}

#[test]
fn siblings_bounded_by_parent_children() {
    let tree = select_tree();
    let view = TreeView::new(&tree);
    let children = view.children(view.root());

    assert_eq!(None, view.previous_sibling(children[0]));
    assert_eq!(Some(children[1]), view.next_sibling(children[0]));
    assert_eq!(Some(children[0]), view.previous_sibling(children[1]));
    assert_eq!(None, view.next_sibling(children[1]));
    assert_eq!(None, view.next_sibling(view.root()));
}

#[test]
fn nonterminal_text_is_covering_source() {
    let tree = select_tree();
    let view = TreeView::new(&tree);
    let root = view.root();
    let children = view.children(root);

    assert_eq!("a b c", &*view.text(root));
    assert_eq!("a b", &*view.text(children[0]));
    assert_eq!("c", &*view.text(children[1]));
    assert!(view.is_leaf(children[1]));
    assert!(!view.is_leaf(children[0]));
}

// Without source text,
//   non-terminal text falls back to concatenated terminals.
#[test]
fn nonterminal_text_without_source() {
    struct NoSource(SourceTree);

    impl RawTree for NoSource {
        type Node = usize;

        fn root(&self) -> usize {
            self.0.root()
        }

        fn name(&self, node: &usize) -> Cow<'_, str> {
            self.0.name(node)
        }

        fn children(&self, node: &usize) -> Vec<usize> {
            self.0.children(node)
        }

        fn leaf_text(&self, node: &usize) -> Option<Cow<'_, str>> {
            self.0.leaf_text(node)
        }

        fn interval(&self, _node: &usize) -> Option<ByteInterval> {
            None
        }

        fn source_text(&self, _: ByteInterval) -> Option<Cow<'_, str>> {
            None
        }
    }

    let tree = NoSource(select_tree());
    let view = TreeView::new(&tree);

    assert_eq!("abc", &*view.text(view.root()));
    assert_eq!(None, view.interval(view.root()));
}

#[test]
fn first_descendant_stops_at_first_match() {
    let tree = nested_tree();
    let view = TreeView::new(&tree);

    let found = view
        .find_first_descendant_by_name(view.root(), "item")
        .expect("item exists");

    // The outer item, not the nested one.
    assert_eq!("x y", &*view.text(found));
    assert_eq!(
        None,
        view.find_first_descendant_by_name(view.root(), "missing")
    );
}

#[test]
fn first_descendant_excludes_self() {
    let tree = select_tree();
    let view = TreeView::new(&tree);

    assert_eq!(
        None,
        view.find_first_descendant_by_name(view.root(), "selectStmt")
    );
}

#[test]
fn layer_stops_per_branch_but_explores_siblings() {
    let tree = nested_tree();
    let view = TreeView::new(&tree);

    let layer = view.find_descendant_layer_by_name(view.root(), "item");

    // The nested `x` item is beneath a match and is not included,
    //   but `z` beneath the unmatched `wrap` is.
    assert_eq!(vec!["x y", "z"], texts(&view, &layer));
}

#[test]
fn all_descendants_do_not_stop() {
    let tree = nested_tree();
    let view = TreeView::new(&tree);

    let all = view.find_all_descendants_by_name(view.root(), "item");
    assert_eq!(vec!["x y", "x", "z"], texts(&view, &all));

    let every = view.find_all_descendants_by_name(view.root(), "*");
    assert_eq!(5, every.len());
}

#[test]
fn layer_over_select_finds_frontier() {
    let tree = select_tree();
    let view = TreeView::new(&tree);

    let layer = view.find_descendant_layer_by_name(view.root(), "columnRef");

    assert_eq!(vec!["a", "b", "c"], texts(&view, &layer));
}

#[test]
fn deep_tree_searches_without_recursion() {
    const DEPTH: usize = 50_000;

    let mut builder = SourceTree::builder("root");
    for _ in 0..DEPTH {
        builder.open("nest");
    }
    builder.leaf("needle", "n");
    let tree = builder.finish();

    let view = TreeView::new(&tree);
    let found = view.find_first_descendant_by_name(view.root(), "needle");

    assert!(found.is_some());
    assert_eq!(DEPTH + 2, view.len());
    assert_eq!("n", &*view.text(view.root()));
}

#[test]
fn user_data_upserts() {
    let tree = select_tree();
    let view = TreeView::new(&tree);
    let root = view.root();

    assert!(view.user_data(root, "k").is_none());
    assert!(view.set_user_data(root, "k", Rc::new(1u32)).is_none());

    let prev = view
        .set_user_data(root, "k", Rc::new(2u32))
        .expect("previous value");
    assert_eq!(Some(&1u32), prev.downcast_ref::<u32>());

    let cur = view.user_data(root, "k").expect("current value");
    assert_eq!(Some(&2u32), cur.downcast_ref::<u32>());
}

#[test]
fn document_order_independent_of_materialization() {
    let tree = select_tree();
    let view = TreeView::new(&tree);
    let root = view.root();
    let top = view.children(root);
    let nested = view.children(top[0]);

    // `c` was materialized before `a` and `b`.
    assert!(top[1] < nested[0]);

    let mut nodes = vec![top[1], nested[1], top[0], nested[0]];
    view.sort_document_order(&mut nodes);

    assert_eq!(vec![top[0], nested[0], nested[1], top[1]], nodes);
}

#[test]
fn full_path_names_rules_from_root() {
    let tree = select_tree();
    let view = TreeView::new(&tree);
    let list = view.children(view.root())[0];
    let a = view.children(list)[0];

    assert_eq!("/selectStmt/columnList/columnRef", view.full_path_name(a));
}

#[test]
fn node_set_dedups_and_keeps_order() {
    let mut set = NodeSet::new();

    assert!(set.insert(NodeId(5)));
    assert!(set.insert(NodeId(1)));
    assert!(!set.insert(NodeId(5)));

    assert!(set.contains(NodeId(1)));
    assert!(!set.contains(NodeId(2)));
    assert!(!set.contains(NodeId(500)));
    assert_eq!(&[NodeId(5), NodeId(1)], set.as_slice());
}
