// Tests for schema declaration
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
use crate::tree::{SourceTree, TreeView};

#[derive(Debug, Default)]
struct Column {
    name: String,
    width: Option<i32>,
}

impl SyntaxNode for Column {
    fn describe(def: &mut NodeDef<Self>) {
        def.rule("columnRef").construct_default();
        def.field("name", |c| &mut c.name).term(".");
        def.field("width", |c| &mut c.width).term("width");
    }
}

#[derive(Debug, Default)]
struct Select {
    columns: Vec<Model<Column>>,
    first: Option<Model<Column>>,
    order: Option<Order>,
    tags: Vec<String>,
}

impl SyntaxNode for Select {
    fn describe(def: &mut NodeDef<Self>) {
        def.rule("selectStmt").construct_default();
        def.field("columns", |s| &mut s.columns)
            .subnode(SubnodeDef::nearest().scope("columnList"))
            .subnode(SubnodeDef::immediate());
        def.field("first", |s| &mut s.first)
            .subnode(SubnodeDef::nearest());
        def.field("order", |s| &mut s.order).term("orderBy");
        def.field("tags", |s| &mut s.tags).term("tag");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    Asc,
    Desc,
}

impl SyntaxLiteral for Order {
    fn describe(def: &mut LiteralDef<Self>) {
        def.rule("orderBy")
            .string("direction")
            .value("ASC", Order::Asc)
            .value_when("DESC", Order::Desc, "descending");
    }
}

/// Some node of some tree,
///   for models that are never bound.
fn some_node() -> NodeId {
    let tree = SourceTree::build("root", |_| {});
    TreeView::new(&tree).root()
}

fn field<'a>(decl: &'a NodeDecl, name: &str) -> &'a FieldDecl {
    decl.fields
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("missing field {name}"))
}

#[test]
fn field_kinds_follow_value_types() {
    assert_eq!(FieldKind::Text, <String as FieldValue>::KIND);
    assert_eq!(FieldKind::Int, <Option<i32> as FieldValue>::KIND);
    assert_eq!(FieldKind::Byte, <i8 as FieldValue>::KIND);
    assert_eq!(FieldKind::Double, <f64 as FieldValue>::KIND);
    assert_eq!(FieldKind::Enum, <Option<Order> as FieldValue>::KIND);
    assert_eq!(FieldKind::Object, <Option<Model<Column>> as FieldValue>::KIND);
    assert_eq!(FieldKind::List, <Vec<Model<Column>> as FieldValue>::KIND);
    assert_eq!(FieldKind::Array, <Box<[Model<Column>]> as FieldValue>::KIND);
    assert_eq!(FieldKind::TextList, <Vec<String> as FieldValue>::KIND);

    assert!(FieldKind::Array.is_model());
    assert!(!FieldKind::Enum.is_scalar());
    assert!(FieldKind::Bool.is_scalar());
}

#[test]
fn describe_produces_fields_in_declaration_order() {
    let decl = (TypeRef::of::<Select>().declare)();

    assert_eq!(Some("selectStmt"), decl.rule);
    assert!(decl.construct.is_some());
    assert_eq!(
        vec!["columns", "first", "order", "tags"],
        decl.fields.iter().map(|f| f.name).collect::<Vec<_>>(),
    );

    let columns = field(&decl, "columns");
    assert_eq!(FieldKind::List, columns.kind);
    assert_eq!(
        vec![
            SubnodeDef {
                scope: Some("columnList".into()),
                lookup: Lookup::Nearest,
            },
            SubnodeDef::immediate(),
        ],
        columns.subnodes,
    );
    assert_eq!(
        Some(TypeId::of::<Column>()),
        columns.target.map(|t| t.id),
    );

    let order = field(&decl, "order");
    assert_eq!(vec!["orderBy".to_string()], order.terms);
    assert_eq!(Some(TypeId::of::<Order>()), order.literal.map(|l| l.id));
    assert!(order.target.is_none());
}

#[test]
fn type_without_constructor() {
    struct Bare;

    impl SyntaxNode for Bare {
        fn describe(def: &mut NodeDef<Self>) {
            def.rule("bare");
        }
    }

    let decl = (TypeRef::of::<Bare>().declare)();
    assert!(decl.construct.is_none());
    assert!(decl.fields.is_empty());
}

#[test]
fn construct_and_assign_through_declaration() {
    let decl = (TypeRef::of::<Column>().declare)();
    let node = some_node();

    let construct = decl.construct.as_ref().expect("missing constructor");
    let model = construct("columnRef", node);

    assert_eq!("columnRef", model.rule_name());
    assert_eq!(node, model.node());
    assert_eq!(TypeId::of::<Column>(), model.value_type_id());

    (*field(&decl, "name").assign)(&*model, FieldData::Scalar("a".into()))
        .expect("assign name");
    (*field(&decl, "width").assign)(&*model, FieldData::Scalar("12".into()))
        .expect("assign width");

    let column = downcast_model::<Column>(model).expect("downcast failed");
    assert_eq!("a", column.borrow().name);
    assert_eq!(Some(12), column.borrow().width);
}

#[test]
fn assign_rejects_foreign_models() {
    let decl = (TypeRef::of::<Column>().declare)();
    let other: Rc<dyn AnyBound> =
        Rc::new(Bound::new("selectStmt", some_node(), Select::default()));

    assert_eq!(
        Err(AssignError::Type(type_name::<Column>())),
        (*field(&decl, "name").assign)(&*other, FieldData::Scalar("a".into())),
    );

    assert!(downcast_model::<Column>(other).is_none());
}

#[test]
fn assign_while_borrowed_is_busy() {
    let decl = (TypeRef::of::<Column>().declare)();
    let model = Rc::new(Bound::new("columnRef", some_node(), Column::default()));

    let _held = model.borrow();

    assert_eq!(
        Err(AssignError::Busy),
        (*field(&decl, "name").assign)(&*model, FieldData::Scalar("a".into())),
    );

    assert!(matches!(
        (*field(&decl, "name").render)(&*model),
        Rendered::Error(_),
    ));
}

#[test]
fn scalar_parsing() {
    let mut n = 0i32;
    assert_eq!(Ok(()), n.assign(FieldData::Scalar("-42".into())));
    assert_eq!(-42, n);

    assert_eq!(
        Err(AssignError::Parse(FieldKind::Int, "4x".into())),
        n.assign(FieldData::Scalar("4x".into())),
    );

    // Out of range for a byte.
    let mut b = 0i8;
    assert!(b.assign(FieldData::Scalar("300".into())).is_err());

    let mut flag = false;
    assert_eq!(Ok(()), flag.assign(FieldData::Scalar("TRUE".into())));
    assert!(flag);
    assert_eq!(Ok(()), flag.assign(FieldData::Scalar("yes".into())));
    assert!(!flag);

    let mut d = 0f64;
    assert_eq!(Ok(()), d.assign(FieldData::Scalar("2.5".into())));
    assert_eq!(2.5, d);
}

#[test]
fn shape_mismatch() {
    let mut s = String::new();

    assert_eq!(
        Err(AssignError::Shape(FieldKind::Text, "text list")),
        s.assign(FieldData::Texts(vec![])),
    );

    let mut order: Option<Order> = None;
    assert_eq!(
        Err(AssignError::Shape(FieldKind::Enum, "scalar")),
        order.assign(FieldData::Scalar("ASC".into())),
    );
}

#[test]
fn literal_assign_and_render() {
    let mut order: Option<Order> = None;
    assert!(matches!(order.render(), Rendered::Null));

    assert_eq!(Ok(()), order.assign(FieldData::Literal(Arc::new(Order::Desc))));
    assert_eq!(Some(Order::Desc), order);
    assert!(matches!(order.render(), Rendered::Quoted(s) if s == "Desc"));

    assert_eq!(
        Err(AssignError::Type(type_name::<Order>())),
        order.assign(FieldData::Literal(Arc::new(5i32))),
    );
}

#[test]
fn optional_scalars_render_null_until_assigned() {
    let mut width: Option<i64> = None;
    assert!(matches!(width.render(), Rendered::Null));

    width.assign(FieldData::Scalar("7".into())).expect("assign");
    assert!(matches!(width.render(), Rendered::Raw(s) if s == "7"));

    assert!(matches!("x".to_string().render(), Rendered::Quoted(s) if s == "x"));
}

#[test]
fn literal_declaration() {
    let decl = (LiteralRef::of::<Order>().declare)();

    assert_eq!(Some("orderBy"), decl.rule);
    assert_eq!(Some("direction".to_string()), decl.string);
    assert_eq!(
        vec![("ASC", None), ("DESC", Some("descending".to_string()))],
        decl.values
            .iter()
            .map(|v| (v.name, v.when.clone()))
            .collect::<Vec<_>>(),
    );
    assert_eq!(
        Some(&Order::Desc),
        decl.values[1].value.downcast_ref::<Order>(),
    );
}

#[test]
fn try_unwrap_sole_reference() {
    let model = Rc::new(Bound::new("columnRef", some_node(), Column::default()));
    let other = model.clone();

    let model = Bound::try_unwrap(model).expect_err("shared model unwrapped");
    drop(other);

    let column = Bound::try_unwrap(model).expect("sole model not unwrapped");
    assert_eq!("", column.name);
}

#[test]
fn bindings_are_recorded_and_cleared() {
    let model = Rc::new(Bound::new("columnRef", some_node(), Column::default()));
    let node = model.node();

    model.push_binding(Binding {
        field: "name",
        node,
        span: None,
        text: "a".into(),
        path: String::new(),
    });

    assert_eq!(1, model.bindings().len());
    assert_eq!("name", model.bindings()[0].field);

    AnyBound::clear_bindings(&*model);
    assert!(model.bindings().is_empty());
}
