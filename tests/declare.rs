mod common;

use std::{
    any::{Any, TypeId},
    collections::HashSet,
    fmt,
    hash::Hasher,
};

use common::hash_of;
use records::{
    record, structural, Comparison, FieldValue, IndexMap, Record, RecordError, Structural,
    TypeExpr, Value,
};

/// An example with all the types of possible parameters.
#[record]
fn AllParameterTypes(
    #[positional] pos: f64,
    pos_kw: i64,
    #[args] args: i64,
    #[keyword] kw: String,
    #[kwargs] kwargs: i64,
) {
}

#[record]
fn Point1D(x: f64) {}

#[record]
fn Point2D(x: f64, y: f64) {}

#[record]
fn NoParameters() {}

fn all_parameter_types() -> AllParameterTypes {
    AllParameterTypes::new(1.0, 2, [3, 4], "5".to_string(), [("extra", 6)])
}

#[test]
fn fields_follow_declaration_order() {
    assert_eq!(
        AllParameterTypes::FIELDS,
        ["pos", "pos_kw", "args", "kw", "kwargs"]
    );
    assert_eq!(
        AllParameterTypes::descriptor().fields(),
        ["pos", "pos_kw", "args", "kw", "kwargs"]
    );
}

#[test]
fn no_parameters() {
    assert!(NoParameters::FIELDS.is_empty());
    assert!(NoParameters::MATCH_ARGS.is_empty());
    assert_eq!(NoParameters::new(), NoParameters::default());
    assert_eq!(NoParameters::new().to_string(), "NoParameters()");
}

#[test]
fn single_field() {
    assert_eq!(Point1D::FIELDS, ["x"]);
    assert_eq!(*Point1D::new(2.0).x(), 2.0);
}

#[test]
fn match_args_stop_at_the_first_non_positional_field() {
    assert_eq!(AllParameterTypes::MATCH_ARGS, ["pos", "pos_kw"]);
    assert_eq!(AllParameterTypes::descriptor().match_args(), ["pos", "pos_kw"]);

    let instance = all_parameter_types();
    let (pos, pos_kw) = instance.match_args();
    assert_eq!((*pos, *pos_kw), (1.0, 2));
}

#[test]
fn annotations_describe_stored_types() {
    let expected: IndexMap<String, TypeExpr> = [
        ("pos", TypeExpr::of::<f64>()),
        ("pos_kw", TypeExpr::of::<i64>()),
        ("args", TypeExpr::sequence(TypeExpr::of::<i64>())),
        ("kw", TypeExpr::of::<String>()),
        (
            "kwargs",
            TypeExpr::mapping(TypeExpr::of::<String>(), TypeExpr::of::<i64>()),
        ),
    ]
    .into_iter()
    .map(|(name, ty)| (name.to_string(), ty))
    .collect();
    assert_eq!(AllParameterTypes::descriptor().annotations(), &expected);
}

#[record]
fn Options(verbose: bool, level: i64) {}

#[record]
fn Command(name: String, #[kwargs] options: records::Unpack<Options>) {}

#[test]
fn unpacked_keywords_keep_their_shape() {
    let annotations = Command::descriptor().annotations();
    assert_eq!(annotations["options"], TypeExpr::of::<Options>());

    let init = Command::descriptor().init_annotations();
    assert_eq!(
        init["options"],
        TypeExpr::unpack(TypeExpr::of::<Options>())
    );

    let command = Command::new("run".to_string(), Options::new(true, 3));
    assert!(*command.options().verbose());
    assert_eq!(
        command.to_string(),
        "Command(name='run', **Options(verbose=True, level=3))"
    );
}

#[test]
fn init_annotations_end_with_the_return_type() {
    let init = Point2D::descriptor().init_annotations();
    let names: Vec<_> = init.keys().map(String::as_str).collect();
    assert_eq!(names, ["x", "y", "return"]);
    assert_eq!(init["return"], TypeExpr::Unit);
}

#[record]
fn ExplicitUnit(x: i64) -> () {}

#[test]
fn explicit_unit_return_is_accepted() {
    assert_eq!(*ExplicitUnit::new(1).x(), 1);
    assert_eq!(ExplicitUnit::descriptor().init_annotations()["return"], TypeExpr::Unit);
}

/// This is the docstring.
#[record]
fn Documented() {}

#[test]
fn doc_comments_become_the_type_doc() {
    assert_eq!(Documented::descriptor().doc(), Some("This is the docstring."));
    assert_eq!(NoParameters::descriptor().doc(), None);
}

#[test]
fn names_come_from_the_declaration() {
    #[record]
    fn Inner(value: i64) {}

    let descriptor = Inner::descriptor();
    assert_eq!(descriptor.name(), "Inner");
    assert_eq!(descriptor.qualname(), concat!(module_path!(), "::Inner"));
    assert_eq!(descriptor.module(), module_path!());
    assert_eq!(Inner::new(1).type_name(), "Inner");
}

/// Hand written carrier whose fields may be unset.
#[derive(Debug)]
struct HasSlots {
    x: Option<f64>,
    y: Option<f64>,
}

impl Structural for HasSlots {
    fn type_name(&self) -> &str {
        "HasSlots"
    }

    fn field_names(&self) -> Option<Vec<&str>> {
        Some(vec!["x", "y"])
    }

    fn field(&self, name: &str) -> Option<&dyn FieldValue> {
        match name {
            "x" => self.x.as_ref().map(|x| x as &dyn FieldValue),
            "y" => self.y.as_ref().map(|y| y as &dyn FieldValue),
            _ => None,
        }
    }
}

#[test]
fn equality_is_structural() {
    #[record]
    fn OtherPoint2D(x: f64, y: f64) {}

    assert_eq!(Point2D::new(2.0, 3.0), Point2D::new(2.0, 3.0));
    assert_ne!(Point2D::new(2.0, 3.0), Point2D::new(2.0, 4.0));
    assert_eq!(Point2D::new(2.0, 3.0), OtherPoint2D::new(2.0, 3.0));
    assert_ne!(Point1D::new(2.0), Point2D::new(2.0, 3.0));
    assert_eq!(
        structural::compare(&Point1D::new(2.0), &Point2D::new(2.0, 3.0)),
        Comparison::Incomparable
    );

    let unset = HasSlots { x: None, y: None };
    assert_ne!(Point2D::new(2.0, 3.0), unset);
    assert_eq!(
        structural::compare(&Point2D::new(2.0, 3.0), &unset),
        Comparison::Incomparable
    );

    let set = HasSlots {
        x: Some(2.0),
        y: Some(3.0),
    };
    assert_eq!(Point2D::new(2.0, 3.0), set);
}

#[test]
fn equal_records_hash_alike() {
    #[record]
    fn OtherPoint2D(x: f64, y: f64) {}

    assert_eq!(
        hash_of(&Point2D::new(2.0, 3.0)),
        hash_of(&Point2D::new(2.0, 3.0))
    );
    assert_eq!(
        hash_of(&Point2D::new(2.0, 3.0)),
        hash_of(&OtherPoint2D::new(2.0, 3.0))
    );
    assert_eq!(hash_of(&all_parameter_types()), hash_of(&all_parameter_types()));
}

#[record]
fn Defaults(
    #[positional]
    #[default(1)]
    a: i64,
    #[default(2)] b: i64,
    #[args] rest: i64,
    #[keyword]
    #[default = "three"]
    c: &'static str,
) {
}

#[test]
fn defaults_fill_missing_fields() {
    let defaults = Defaults::default();
    assert_eq!((*defaults.a(), *defaults.b(), *defaults.c()), (1, 2, "three"));
    assert!(defaults.rest().is_empty());
    assert_eq!(defaults.to_string(), "Defaults(1, b=2, *(), c='three')");

    let params = Defaults::descriptor().parameters();
    assert_eq!(params[0].default(), Some(&Value::Int(1)));
    assert_eq!(params[2].default(), None);
    assert_eq!(params[3].default(), Some(&Value::from("three")));
}

#[record]
fn Partial(x: i64, #[default(2)] y: i64, #[keyword] #[default(3)] z: i64) {}

#[test]
fn constructor_applies_declared_defaults() {
    let partial = Partial::new(1);
    assert_eq!((*partial.x(), *partial.y(), *partial.z()), (1, 2, 3));
    assert_eq!(partial.to_string(), "Partial(x=1, y=2, z=3)");

    let replaced = Partial::new(1).with_z(30);
    assert_eq!(replaced.to_string(), "Partial(x=1, y=2, z=30)");
    assert_eq!(Partial::new(1).with_y(2), partial);
}

#[test]
fn records_are_hash_set_members() {
    let mut points = HashSet::new();
    assert!(points.insert(Point2D::new(2.0, 3.0)));
    assert!(!points.insert(Point2D::new(2.0, 3.0)));
    assert!(points.insert(Point2D::new(2.0, 4.0)));
    assert!(points.contains(&Point2D::new(2.0, 3.0)));
    assert!(!points.contains(&Point2D::new(3.0, 2.0)));
    assert_eq!(points.len(), 2);
}

#[derive(Clone, PartialEq)]
struct FunkyRepr;

impl FieldValue for FunkyRepr {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        other.as_any().is::<Self>()
    }

    fn hash_field(&self, _state: &mut dyn Hasher) {}

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("!!! not a literal !!!")
    }
}

#[record]
fn Odd(#[default(0.0)] x: f64, #[default(FunkyRepr)] y: FunkyRepr) {}

#[test]
fn defaults_with_custom_reprs() {
    assert_eq!(
        Odd::default().to_string(),
        "Odd(x=0.0, y=!!! not a literal !!!)"
    );
    let y = Odd::descriptor().parameters()[1].default().unwrap();
    assert_eq!(y.to_string(), "!!! not a literal !!!");
}

#[test]
fn records_are_immutable() {
    let point = Point2D::new(2.0, 3.0);
    assert_eq!(
        point.set_field("x", Value::from(4.0)),
        Err(RecordError::Assignment {
            type_name: "Point2D".to_string()
        })
    );
    let err = point.delete_field("x").unwrap_err();
    assert_eq!(err.to_string(), "Point2D object does not support attribute deletion");
    assert_eq!(*point.x(), 2.0);
}

#[test]
fn new_binds_every_kind() {
    let instance = all_parameter_types();
    assert_eq!(*instance.pos(), 1.0);
    assert_eq!(*instance.pos_kw(), 2);
    assert_eq!(&**instance.args(), [3, 4]);
    assert_eq!(instance.kw(), "5");
    assert_eq!(instance.kwargs().get("extra"), Some(&6));
}

#[test]
fn repr_reconstructs_the_call() {
    assert_eq!(
        all_parameter_types().to_string(),
        "AllParameterTypes(1.0, pos_kw=2, *(3, 4), kw='5', **{'extra': 6})"
    );
    assert_eq!(format!("{:?}", Point1D::new(-0.5)), "Point1D(x=-0.5)");
}

mod other {
    use records::record;

    #[record]
    pub fn Twin(x: i64) {}
}

#[test]
fn identical_declarations_are_distinct_types() {
    #[record]
    fn Twin(x: i64) {}

    assert_ne!(TypeId::of::<Twin>(), TypeId::of::<other::Twin>());
    assert!(!std::ptr::eq(Twin::descriptor(), other::Twin::descriptor()));
    assert_ne!(Twin::descriptor().qualname(), other::Twin::descriptor().qualname());
    assert_eq!(Twin::new(1), other::Twin::new(1));
}

#[test]
fn records_nest() {
    #[record]
    fn Line(start: Point2D, end: Point2D) {}

    let line = Line::new(Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0));
    assert_eq!(
        line.to_string(),
        "Line(start=Point2D(x=0.0, y=0.0), end=Point2D(x=1.0, y=1.0))"
    );
    assert_eq!(
        line,
        Line::new(Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0))
    );
    assert_ne!(
        line,
        Line::new(Point2D::new(0.0, 0.0), Point2D::new(1.0, 2.0))
    );
}

#[test]
fn records_are_shareable() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<AllParameterTypes>();
    assert_send_sync::<Command>();
}
