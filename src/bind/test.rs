// Tests for the binding engine
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
use crate::{
    model::{LiteralDef, NodeDef, SubnodeDef},
    tree::SourceTree,
};

#[derive(Debug, Default)]
struct Column {
    name: String,
}

impl SyntaxNode for Column {
    fn describe(def: &mut NodeDef<Self>) {
        def.rule("columnRef").construct_default();
        def.field("name", |c| &mut c.name).term(".");
    }
}

#[derive(Debug, Default)]
struct Select {
    columns: Vec<Model<Column>>,
    first: Option<Model<Column>>,
    tags: Vec<String>,
}

impl SyntaxNode for Select {
    fn describe(def: &mut NodeDef<Self>) {
        def.rule("selectStmt").construct_default();
        def.field("columns", |s| &mut s.columns)
            .subnode(SubnodeDef::nearest());
        def.field("first", |s| &mut s.first)
            .subnode(SubnodeDef::nearest());
        def.field("tags", |s| &mut s.tags).term("columnList/columnRef");
    }
}

// selectStmt            [0, 5)
// |- columnList         [0, 3)
// |  |- columnRef "a"   [0, 1)
// |  `- columnRef "b"   [2, 3)
// `- columnRef "c"      [4, 5)
fn select_tree() -> SourceTree {
    SourceTree::build("selectStmt", |b| {
        b.rule("columnList", |b| {
            b.leaf("columnRef", "a");
            b.leaf("columnRef", "b");
        });
        b.leaf("columnRef", "c");
    })
}

fn schema<T: SyntaxNode>() -> SyntaxModel {
    SyntaxModel::from_entry::<T>()
        .unwrap_or_else(|e| panic!("schema failed: {e}"))
}

fn names(columns: &[Model<Column>]) -> Vec<String> {
    columns.iter().map(|c| c.borrow().name.clone()).collect()
}

#[test]
fn nearest_match_per_branch_in_position_order() {
    let schema = schema::<Select>();
    let tree = select_tree();
    let view = TreeView::new(&tree);

    let result = bind::<Select, _>(&schema, &view, view.root());
    assert!(result.is_ok());
    assert!(result.diagnostics().is_empty());

    let select = result.into_model().expect("missing model");
    let select = select.borrow();

    assert_eq!(vec!["a", "b", "c"], names(&select.columns));
    assert_eq!(
        Some("a".to_string()),
        select.first.as_ref().map(|c| c.borrow().name.clone()),
    );
    assert_eq!(vec!["a", "b"], select.tags);
}

#[test]
fn entry_found_by_descending() {
    let schema = schema::<Select>();
    let tree = select_tree();
    let view = TreeView::new(&tree);

    let column = bind::<Column, _>(&schema, &view, view.root())
        .into_model()
        .expect("missing model");

    assert_eq!("a", column.borrow().name);
    assert_eq!("columnRef", column.rule_name());
}

#[test]
fn no_match_is_not_ok_without_error() {
    let schema = schema::<Select>();
    let tree = SourceTree::build("selectStmt", |b| {
        b.leaf("tableRef", "t");
    });
    let view = TreeView::new(&tree);

    let list = view.children(view.root())[0];
    let result = bind::<Column, _>(&schema, &view, list);

    assert!(!result.is_ok());
    assert!(result.diagnostics().is_empty());
}

#[test]
fn unregistered_entry_type() {
    #[derive(Default)]
    struct Stranger;

    impl SyntaxNode for Stranger {
        fn describe(def: &mut NodeDef<Self>) {
            def.rule("stranger").construct_default();
        }
    }

    let schema = schema::<Select>();
    let tree = SourceTree::build("stranger", |_| {});
    let view = TreeView::new(&tree);

    let result = bind::<Stranger, _>(&schema, &view, view.root());

    assert!(!result.is_ok());
    assert_eq!(
        vec![BindError::Unregistered {
            type_name: type_name::<Stranger>(),
        }],
        result.into_parts().1,
    );
}

#[test]
fn same_node_yields_same_model() {
    let schema = schema::<Select>();
    let tree = select_tree();
    let view = TreeView::new(&tree);
    let mut session = BindSession::new(&schema, &view, BindOptions::default());

    let select = session
        .resolve::<Select>(view.root(), false)
        .expect("missing select");
    let c = view.children(view.root())[1];

    let first = session.resolve::<Column>(c, false).expect("missing c");
    let again = session.resolve::<Column>(c, false).expect("missing c");

    assert!(Rc::ptr_eq(&first, &again));
    assert!(Rc::ptr_eq(&first, &select.borrow().columns[2]));
    assert!(session.finish().is_empty());
}

#[test]
fn refill_rebuilds_lists_in_place() {
    let schema = schema::<Select>();
    let tree = select_tree();
    let view = TreeView::new(&tree);
    let mut session = BindSession::new(&schema, &view, BindOptions::default());

    let select = session.fill::<Select>(view.root()).expect("missing select");
    let columns = select.borrow().columns.clone();
    let bindings = select.bindings().len();

    let again = session.fill::<Select>(view.root()).expect("missing select");

    assert!(Rc::ptr_eq(&select, &again));
    assert_eq!(3, again.borrow().columns.len());
    assert!(columns
        .iter()
        .zip(again.borrow().columns.iter())
        .all(|(a, b)| Rc::ptr_eq(a, b)));
    assert_eq!(bindings, again.bindings().len());
}

#[test]
fn resolve_without_descent_requires_exact_match() {
    let schema = schema::<Select>();
    let tree = select_tree();
    let view = TreeView::new(&tree);
    let mut session = BindSession::new(&schema, &view, BindOptions::default());

    assert!(session.resolve::<Column>(view.root(), false).is_none());
    assert!(session.resolve::<Column>(view.root(), true).is_some());
}

#[test]
fn resolve_all_by_lookup_mode() {
    let schema = schema::<Select>();
    let tree = select_tree();
    let view = TreeView::new(&tree);
    let mut session = BindSession::new(&schema, &view, BindOptions::default());
    let root = view.root();

    assert_eq!(
        vec!["a", "b", "c"],
        names(&session.resolve_all::<Column>(root, Lookup::Nearest)),
    );
    assert!(session.resolve_all::<Column>(root, Lookup::Immediate).is_empty());

    let c = view.children(root)[1];
    assert_eq!(
        vec!["c"],
        names(&session.resolve_all::<Column>(c, Lookup::Immediate)),
    );
}

#[test]
fn fill_stamps_interval_as_span() {
    let schema = schema::<Select>();
    let tree = select_tree();
    let view = TreeView::new(&tree);

    let select = bind::<Select, _>(&schema, &view, view.root())
        .into_model()
        .expect("missing model");

    assert_eq!(Span::new(0, 5), select.span());

    for column in &select.borrow().columns {
        let span = column.span();

        assert!(span.start() <= span.end());
        assert_eq!(view.interval(column.node()), Some(span));
    }
}

#[test]
fn no_interval_keeps_default_span() {
    let schema = schema::<Select>();
    let tree = SourceTree::build("selectStmt", |b| {
        b.rule("columnRef", |_| {});
    });
    let view = TreeView::new(&tree);

    let result = bind::<Select, _>(&schema, &view, view.root());
    assert!(result.diagnostics().is_empty());

    let select = result.into_model().expect("missing model");
    assert_eq!(UNKNOWN_SPAN, select.span());
    assert_eq!(UNKNOWN_SPAN, select.borrow().columns[0].span());
}

#[test]
fn bindings_record_producing_nodes() {
    let schema = schema::<Select>();
    let tree = select_tree();
    let view = TreeView::new(&tree);

    let select = bind::<Select, _>(&schema, &view, view.root())
        .into_model()
        .expect("missing model");

    let bindings = select.bindings();
    let columns = bindings
        .iter()
        .filter(|b| b.field == "columns")
        .map(|b| (&*b.text, b.path.as_str()))
        .collect::<Vec<_>>();

    assert_eq!(
        vec![
            ("a", "/columnList/columnRef"),
            ("b", "/columnList/columnRef"),
            ("c", "/columnRef"),
        ],
        columns,
    );

    // A term selecting more than one node records no single producer.
    assert!(!bindings.iter().any(|b| b.field == "tags"));

    let c = select.borrow().columns[2].clone();
    let name = c.bindings()[0].clone();
    assert_eq!("name", name.field);
    assert_eq!(c.node(), name.node);
    assert_eq!("", name.path);
    assert_eq!(Some(Span::new(4, 5)), name.span);
}

mod ordering {
    use super::*;

    #[derive(Debug, Default)]
    struct Select {
        columns: Vec<Model<Column>>,
    }

    impl SyntaxNode for Select {
        fn describe(def: &mut NodeDef<Self>) {
            def.rule("selectStmt").construct_default();
            def.field("columns", |s| &mut s.columns)
                .subnode(SubnodeDef::immediate())
                .subnode(SubnodeDef::nearest().scope("columnList"))
                .subnode(SubnodeDef::nearest());
        }
    }

    #[test]
    fn union_of_specs_deduplicated_and_sorted() {
        let schema = schema::<Select>();
        let tree = select_tree();
        let view = TreeView::new(&tree);

        let select = bind::<Select, _>(&schema, &view, view.root())
            .into_model()
            .expect("missing model");

        // `c` is found first;
        //   every column is found by two specs.
        assert_eq!(vec!["a", "b", "c"], names(&select.borrow().columns));

        let starts = select
            .borrow()
            .columns
            .iter()
            .map(|c| c.span().start())
            .collect::<Vec<_>>();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }
}

mod nested {
    use super::*;

    #[derive(Debug, Default)]
    struct Item {
        inner: Vec<Model<Item>>,
    }

    impl SyntaxNode for Item {
        fn describe(def: &mut NodeDef<Self>) {
            def.rule("item").construct_default();
            def.field("inner", |i| &mut i.inner)
                .subnode(SubnodeDef::nearest());
        }
    }

    #[derive(Debug, Default)]
    struct List {
        items: Vec<Model<Item>>,
    }

    impl SyntaxNode for List {
        fn describe(def: &mut NodeDef<Self>) {
            def.rule("list").construct_default();
            def.field("items", |l| &mut l.items)
                .subnode(SubnodeDef::nearest());
        }
    }

    // list
    // |- group
    // |  `- item
    // |     `- item "x"
    // `- item "y"
    #[test]
    fn search_stops_at_first_match_of_each_branch() {
        let schema = schema::<List>();
        let tree = SourceTree::build("list", |b| {
            b.rule("group", |b| {
                b.rule("item", |b| {
                    b.leaf("item", "x");
                });
            });
            b.leaf("item", "y");
        });
        let view = TreeView::new(&tree);

        let list = bind::<List, _>(&schema, &view, view.root())
            .into_model()
            .expect("missing model");
        let list = list.borrow();

        assert_eq!(2, list.items.len());
        assert_eq!(1, list.items[0].borrow().inner.len());
        assert!(list.items[1].borrow().inner.is_empty());

        assert_eq!("x", &*view.text(list.items[0].borrow().inner[0].node()));
        assert_eq!("y", &*view.text(list.items[1].node()));
    }
}

mod object {
    use super::*;

    #[derive(Debug, Default)]
    struct Wrapper {
        col: Option<Model<Column>>,
    }

    impl SyntaxNode for Wrapper {
        fn describe(def: &mut NodeDef<Self>) {
            def.rule("selectStmt").construct_default();
            def.field("col", |w| &mut w.col)
                .subnode(SubnodeDef::immediate().scope("nothing"))
                .subnode(SubnodeDef::immediate())
                .subnode(SubnodeDef::nearest());
        }
    }

    #[test]
    fn first_spec_with_a_match_wins() {
        let schema = schema::<Wrapper>();
        let tree = select_tree();
        let view = TreeView::new(&tree);

        let wrapper = bind::<Wrapper, _>(&schema, &view, view.root())
            .into_model()
            .expect("missing model");

        let col = wrapper.borrow().col.clone().expect("missing column");
        assert_eq!("c", col.borrow().name);

        // Only the winning column was bound.
        let a = view.children(view.children(view.root())[0])[0];
        assert!(view.model(a).is_none());
    }

    #[test]
    fn unmatched_object_left_unset() {
        let schema = schema::<Wrapper>();
        let tree = SourceTree::build("selectStmt", |b| {
            b.leaf("tableRef", "t");
        });
        let view = TreeView::new(&tree);

        let result = bind::<Wrapper, _>(&schema, &view, view.root());
        assert!(result.diagnostics().is_empty());

        let wrapper = result.into_model().expect("missing model");
        assert!(wrapper.borrow().col.is_none());
    }
}

mod reentrant {
    use super::*;

    #[derive(Debug, Default)]
    struct Owned {
        owner: Option<Model<Owner>>,
    }

    impl SyntaxNode for Owned {
        fn describe(def: &mut NodeDef<Self>) {
            def.rule("columnRef").construct_default();
            def.field("owner", |o| &mut o.owner)
                .subnode(SubnodeDef::immediate().scope("ancestor::selectStmt"));
        }
    }

    #[derive(Debug, Default)]
    struct Owner {
        columns: Vec<Model<Owned>>,
    }

    impl SyntaxNode for Owner {
        fn describe(def: &mut NodeDef<Self>) {
            def.rule("selectStmt").construct_default();
            def.field("columns", |o| &mut o.columns)
                .subnode(SubnodeDef::nearest());
        }
    }

    #[test]
    fn ancestor_being_filled_yields_its_memo() {
        let schema = schema::<Owner>();
        let tree = select_tree();
        let view = TreeView::new(&tree);

        let result = bind::<Owner, _>(&schema, &view, view.root());
        assert!(result.diagnostics().is_empty());

        let owner = result.into_model().expect("missing model");
        let columns = owner.borrow().columns.clone();

        assert_eq!(3, columns.len());

        for column in columns {
            let back = column.borrow().owner.clone().expect("missing owner");
            assert!(Rc::ptr_eq(&owner, &back));
        }
    }
}

mod literal {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Order {
        Asc,
        Desc,
    }

    impl SyntaxLiteral for Order {
        fn describe(def: &mut LiteralDef<Self>) {
            def.rule("orderBy")
                .value("ASC", Order::Asc)
                .value("DESC", Order::Desc);
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Number,
        Word,
        Empty,
    }

    impl SyntaxLiteral for Kind {
        fn describe(def: &mut LiteralDef<Self>) {
            def.rule("kind")
                .value_when("NUMBER", Kind::Number, "number(.) = number(.)")
                .value_when("WORD", Kind::Word, "string-length(.) > 0")
                .value_when("EMPTY", Kind::Empty, "string-length(.) = 0");
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Pair {
        Lower,
        Upper,
    }

    impl SyntaxLiteral for Pair {
        fn describe(def: &mut LiteralDef<Self>) {
            def.rule("pair")
                .value("ab", Pair::Lower)
                .value("AB", Pair::Upper);
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Distinct {
        Ab,
        Cd,
    }

    impl SyntaxLiteral for Distinct {
        fn describe(def: &mut LiteralDef<Self>) {
            def.rule("distinct")
                .value("ab", Distinct::Ab)
                .value("cd", Distinct::Cd);
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Named {
        Left,
        Right,
    }

    impl SyntaxLiteral for Named {
        fn describe(def: &mut LiteralDef<Self>) {
            def.rule("side")
                .string("side")
                .value("LEFT", Named::Left)
                .value("RIGHT", Named::Right);
        }
    }

    #[derive(Debug, Default)]
    struct Holder {
        order: Option<Order>,
        fixed: Option<Order>,
        kind: Option<Kind>,
        pair: Option<Pair>,
        distinct: Option<Distinct>,
        side: Option<Named>,
    }

    impl SyntaxNode for Holder {
        fn describe(def: &mut NodeDef<Self>) {
            def.rule("holder").construct_default();
            def.field("order", |h| &mut h.order).term("orderBy");
            def.field("fixed", |h| &mut h.fixed).term("'desc'");
            def.field("kind", |h| &mut h.kind).term("kind");
            def.field("pair", |h| &mut h.pair).term("pair");
            def.field("distinct", |h| &mut h.distinct).term("distinct");
            def.field("side", |h| &mut h.side).term("sideSpec");
        }
    }

    fn holder(f: impl FnOnce(&mut crate::tree::SourceTreeBuilder)) -> SourceTree {
        SourceTree::build("holder", f)
    }

    fn bind_holder(tree: &SourceTree) -> Model<Holder> {
        let schema = schema::<Holder>();
        let view = TreeView::new(tree);

        let result = bind::<Holder, _>(&schema, &view, view.root());
        assert!(result.diagnostics().is_empty(), "{:?}", result.diagnostics());

        result.into_model().expect("missing model")
    }

    #[test]
    fn names_matched_ignoring_case_when_distinct() {
        let tree = holder(|b| {
            b.leaf("orderBy", "desc");
            b.leaf("distinct", "CD");
        });

        let holder = bind_holder(&tree);
        let holder = holder.borrow();

        assert_eq!(Some(Order::Desc), holder.order);
        assert_eq!(Some(Distinct::Cd), holder.distinct);
    }

    #[test]
    fn string_result_looked_up_by_name() {
        let tree = holder(|_| {});

        assert_eq!(Some(Order::Desc), bind_holder(&tree).borrow().fixed);
    }

    #[test]
    fn colliding_names_matched_exactly() {
        let schema = schema::<Holder>();
        let tree = holder(|b| {
            b.leaf("pair", "ab");
            b.leaf("pair", "AB");
            b.leaf("pair", "Ab");
            b.leaf("distinct", "AB");
        });
        let view = TreeView::new(&tree);
        let children = view.children(view.root());
        let mut session = BindSession::new(&schema, &view, BindOptions::default());

        assert_eq!(Some(Pair::Lower), session.resolve_literal::<Pair>(children[0]));
        assert_eq!(Some(Pair::Upper), session.resolve_literal::<Pair>(children[1]));
        assert_eq!(None, session.resolve_literal::<Pair>(children[2]));
        assert_eq!(
            Some(Distinct::Ab),
            session.resolve_literal::<Distinct>(children[3]),
        );
    }

    #[test]
    fn predicates_in_declaration_order() {
        let schema = schema::<Holder>();
        let tree = holder(|b| {
            b.leaf("kind", "42");
            b.leaf("kind", "abc");
            b.leaf("kind", "");
            b.leaf("kind", "word");
        });
        let view = TreeView::new(&tree);
        let children = view.children(view.root());
        let mut session = BindSession::new(&schema, &view, BindOptions::default());

        // Both NUMBER and WORD hold for `42`.
        assert_eq!(Some(Kind::Number), session.resolve_literal::<Kind>(children[0]));
        assert_eq!(Some(Kind::Word), session.resolve_literal::<Kind>(children[1]));
        assert_eq!(Some(Kind::Empty), session.resolve_literal::<Kind>(children[2]));

        // Found by name before any predicate is considered.
        assert_eq!(Some(Kind::Word), session.resolve_literal::<Kind>(children[3]));

        assert!(session.finish().is_empty());
    }

    #[test]
    fn many_nodes_leave_literal_unset() {
        let tree = holder(|b| {
            b.leaf("orderBy", "asc");
            b.leaf("orderBy", "desc");
        });

        assert_eq!(None, bind_holder(&tree).borrow().order);
    }

    #[test]
    fn string_query_replaces_node_text() {
        let tree = holder(|b| {
            b.rule("sideSpec", |b| {
                b.leaf("keyword", "ON");
                b.leaf("side", "right");
            });
        });

        assert_eq!(Some(Named::Right), bind_holder(&tree).borrow().side);
    }

    #[test]
    fn unresolved_literal_leaves_field_unset() {
        let tree = holder(|b| {
            b.leaf("orderBy", "sideways");
        });

        assert_eq!(None, bind_holder(&tree).borrow().order);
    }
}

mod errors {
    use super::*;

    #[derive(Debug, Default)]
    struct Measured {
        width: Option<i32>,
        label: String,
    }

    impl SyntaxNode for Measured {
        fn describe(def: &mut NodeDef<Self>) {
            def.rule("sized").construct_default();
            def.field("width", |s| &mut s.width).term("width");
            def.field("label", |s| &mut s.label).term("label");
        }
    }

    fn abort() -> BindOptions {
        BindOptions {
            policy: FieldErrorPolicy::Abort,
        }
    }

    #[test]
    fn parse_failure_leaves_field_unset_and_continues() {
        let schema = schema::<Measured>();
        let tree = SourceTree::build("sized", |b| {
            b.leaf("width", "12x");
            b.leaf("label", "big");
        });
        let view = TreeView::new(&tree);

        let result = bind::<Measured, _>(&schema, &view, view.root());

        assert!(matches!(
            result.diagnostics(),
            [BindError::ScalarParse {
                field: "width",
                kind: FieldKind::Int,
                text,
                ..
            }] if text == "12x",
        ));
        assert_eq!(Level::Error, result.diagnostics()[0].level());

        let measured = result.into_model().expect("missing model");
        assert_eq!(None, measured.borrow().width);
        assert_eq!("big", measured.borrow().label);
    }

    #[test]
    fn abort_policy_yields_no_model() {
        let schema = schema::<Measured>();
        let tree = SourceTree::build("sized", |b| {
            b.leaf("width", "12x");
            b.leaf("label", "big");
        });
        let view = TreeView::new(&tree);

        let result = bind_with::<Measured, _>(&schema, &view, view.root(), abort());

        assert!(!result.is_ok());
        assert_eq!(1, result.diagnostics().len());
    }

    #[test]
    fn later_terms_overwrite_earlier() {
        #[derive(Debug, Default)]
        struct Multi {
            width: i64,
        }

        impl SyntaxNode for Multi {
            fn describe(def: &mut NodeDef<Self>) {
                def.rule("sized").construct_default();
                def.field("width", |m| &mut m.width)
                    .term("width")
                    .term("missing")
                    .term("count(*)");
            }
        }

        let schema = schema::<Multi>();
        let tree = SourceTree::build("sized", |b| {
            b.leaf("width", "7");
            b.leaf("label", "x");
        });
        let view = TreeView::new(&tree);

        let multi = bind::<Multi, _>(&schema, &view, view.root())
            .into_model()
            .expect("missing model");

        // `missing` selects nothing and so does not overwrite.
        assert_eq!(2, multi.borrow().width);
    }

    #[test]
    fn ambiguous_scalar_warns_and_binds_first() {
        let schema = schema::<Measured>();
        let tree = SourceTree::build("sized", |b| {
            b.leaf("label", "x");
            b.leaf("label", "y");
        });
        let view = TreeView::new(&tree);

        let result = bind_with::<Measured, _>(&schema, &view, view.root(), abort());

        assert!(matches!(
            result.diagnostics(),
            [BindError::AmbiguousScalar {
                field: "label",
                count: 2,
                ..
            }],
        ));
        assert_eq!(Level::Warning, result.diagnostics()[0].level());

        // Warnings never abort.
        let measured = result.into_model().expect("missing model");
        assert_eq!("x", measured.borrow().label);
    }

    #[test]
    fn query_failure_recorded() {
        #[derive(Debug, Default)]
        struct Flat {
            text: String,
        }

        impl SyntaxNode for Flat {
            fn describe(def: &mut NodeDef<Self>) {
                def.rule("flat").construct_default();
                def.field("text", |f| &mut f.text).term("flatten(., '1')");
            }
        }

        let schema = schema::<Flat>();
        let tree = SourceTree::build("flat", |b| {
            b.leaf("x", "1");
        });
        let view = TreeView::new(&tree);

        let result = bind::<Flat, _>(&schema, &view, view.root());

        assert!(matches!(
            result.diagnostics(),
            [BindError::Query {
                rule: "flat",
                field: Some("text"),
                err: crate::xpath::XPathError::NotNodeSet { .. },
                ..
            }],
        ));
        assert!(result.is_ok());
    }

    #[test]
    fn scope_must_select_nodes() {
        #[derive(Debug, Default)]
        struct Counted {
            columns: Vec<Model<Column>>,
        }

        impl SyntaxNode for Counted {
            fn describe(def: &mut NodeDef<Self>) {
                def.rule("selectStmt").construct_default();
                def.field("columns", |c| &mut c.columns)
                    .subnode(SubnodeDef::nearest().scope("count(*)"));
            }
        }

        let schema = schema::<Counted>();
        let tree = select_tree();
        let view = TreeView::new(&tree);

        let result = bind::<Counted, _>(&schema, &view, view.root());

        assert!(matches!(
            result.diagnostics(),
            [BindError::ScopeNotNodeSet {
                field: "columns",
                found: "number",
                ..
            }],
        ));

        let counted = result.into_model().expect("missing model");
        assert!(counted.borrow().columns.is_empty());
    }

    #[test]
    fn arrays_end_the_pass() {
        #[derive(Debug, Default)]
        struct Arr {
            items: Box<[Model<Column>]>,
        }

        impl SyntaxNode for Arr {
            fn describe(def: &mut NodeDef<Self>) {
                def.rule("selectStmt").construct_default();
                def.field("items", |a| &mut a.items)
                    .subnode(SubnodeDef::nearest());
            }
        }

        let schema = schema::<Arr>();
        let tree = select_tree();
        let view = TreeView::new(&tree);

        let result = bind::<Arr, _>(&schema, &view, view.root());

        assert!(!result.is_ok());
        assert_eq!(
            vec![BindError::UnsupportedArray {
                rule: "selectStmt",
                field: "items",
            }],
            result.into_parts().1,
        );
    }

    #[test]
    fn node_binds_to_one_model_type() {
        let schema = schema::<Select>();
        let tree = select_tree();
        let view = TreeView::new(&tree);
        let mut session = BindSession::new(&schema, &view, BindOptions::default());

        assert!(session.fill::<Column>(view.root()).is_some());
        assert!(session.fill::<Select>(view.root()).is_none());

        assert!(matches!(
            session.diagnostics(),
            [BindError::ModelMismatch { requested, .. }]
                if *requested == type_name::<Select>(),
        ));
        assert_eq!(Level::InternalError, session.diagnostics()[0].level());
    }
}
