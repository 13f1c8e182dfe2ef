//! Named operators over [`DataSlice`] arguments.
//!
//! Operators are a closed set looked up by their qualified name
//! (`core.extract`, `core.unique`, ...). The registry checks arity and
//! dispatches to the engines.

use super::clone::CloneOp;
use super::extract::{ExtractOp, ShallowCloneOp};
use super::group_by;
use crate::config::Config;
use crate::error::{DataError, DataResult};
use crate::schema;
use crate::slice::DataSlice;
use crate::value::{DType, DataItem};
use std::fmt;
use tracing::debug;

/// Operators exposed by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Extract,
    ExtractWithSchema,
    ShallowClone,
    ShallowCloneWithSchema,
    Clone,
    GroupByIndices,
    GroupByIndicesSorted,
    Unique,
    Follow,
    GetNofollowedSchema,
    NofollowSchema,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Extract,
        Operator::ExtractWithSchema,
        Operator::ShallowClone,
        Operator::ShallowCloneWithSchema,
        Operator::Clone,
        Operator::GroupByIndices,
        Operator::GroupByIndicesSorted,
        Operator::Unique,
        Operator::Follow,
        Operator::GetNofollowedSchema,
        Operator::NofollowSchema,
    ];

    /// Qualified operator name
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Extract => "core.extract",
            Operator::ExtractWithSchema => "core.extract_with_schema",
            Operator::ShallowClone => "core.shallow_clone",
            Operator::ShallowCloneWithSchema => "core.shallow_clone_with_schema",
            Operator::Clone => "core.clone",
            Operator::GroupByIndices => "core.group_by_indices",
            Operator::GroupByIndicesSorted => "core.group_by_indices_sorted",
            Operator::Unique => "core.unique",
            Operator::Follow => "core.follow",
            Operator::GetNofollowedSchema => "core.get_nofollowed_schema",
            Operator::NofollowSchema => "core.nofollow_schema",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Operator::ALL.iter().copied().find(|op| op.as_str() == name)
    }

    /// Accepted argument counts, inclusive; `None` as maximum means variadic
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Operator::ExtractWithSchema | Operator::ShallowCloneWithSchema => (2, Some(2)),
            Operator::GroupByIndices | Operator::GroupByIndicesSorted => (1, None),
            Operator::Unique => (1, Some(2)),
            Operator::Extract
            | Operator::ShallowClone
            | Operator::Clone
            | Operator::Follow
            | Operator::GetNofollowedSchema
            | Operator::NofollowSchema => (1, Some(1)),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatches named operators with configured defaults
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    config: Config,
}

impl OperatorRegistry {
    pub fn new(config: Config) -> Self {
        OperatorRegistry { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        Operator::ALL.iter().map(Operator::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        Operator::from_name(name).is_some()
    }

    /// Evaluate operator `name` on `args`
    pub fn eval(&self, name: &str, args: &[DataSlice]) -> DataResult<DataSlice> {
        let op = Operator::from_name(name)
            .ok_or_else(|| DataError::invalid_argument(format!("unknown operator: {name}")))?;
        self.eval_op(op, args)
    }

    pub fn eval_op(&self, op: Operator, args: &[DataSlice]) -> DataResult<DataSlice> {
        let (min, max) = op.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(DataError::invalid_argument(format!(
                "{op}: expected {} arguments, got {}",
                match max {
                    Some(max) if max == min => min.to_string(),
                    Some(max) => format!("{min} to {max}"),
                    None => format!("at least {min}"),
                },
                args.len()
            )));
        }
        debug!(op = op.as_str(), args = args.len(), "eval_operator");
        let store = &self.config.store;
        match op {
            Operator::Extract => ExtractOp::from_config(store).eval(&args[0], &args[0].schema_slice()),
            Operator::ExtractWithSchema => ExtractOp::from_config(store).eval(&args[0], &args[1]),
            Operator::ShallowClone => {
                ShallowCloneOp::from_config(store).eval(&args[0], &args[0].schema_slice())
            }
            Operator::ShallowCloneWithSchema => {
                ShallowCloneOp::from_config(store).eval(&args[0], &args[1])
            }
            Operator::Clone => CloneOp::from_config(store).eval(&args[0], &args[0].schema_slice()),
            Operator::GroupByIndices => group_by::GroupByIndicesOp::new().eval(args),
            Operator::GroupByIndicesSorted => group_by::GroupByIndicesOp::sorted().eval(args),
            Operator::Unique => {
                let default_sort;
                let sort = match args.get(1) {
                    Some(sort) => sort,
                    None => {
                        default_sort = DataSlice::from_item(
                            DataItem::Bool(self.config.group_by.default_sort),
                            DataItem::DType(DType::Bool),
                        );
                        &default_sort
                    }
                };
                group_by::unique(&args[0], sort)
            }
            Operator::Follow => args[0].follow(),
            Operator::NofollowSchema => args[0].nofollow_schema(),
            Operator::GetNofollowedSchema => {
                let item = args[0].item().ok_or_else(|| {
                    DataError::invalid_argument("get_nofollowed_schema expects a schema item")
                })?;
                let followed = schema::get_nofollowed_schema_item(item)?;
                Ok(DataSlice::from_item(followed, DataItem::DType(DType::Schema))
                    .with_bag(args[0].bag().cloned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::DataSliceImpl;
    use crate::value::allocate_explicit_schema;

    #[test]
    fn test_names_roundtrip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_name(op.as_str()), Some(op));
        }
        assert!(Operator::from_name("core.missing").is_none());
    }

    #[test]
    fn test_unknown_operator_and_arity() {
        let registry = OperatorRegistry::default();
        let err = registry.eval("core.nope", &[]).unwrap_err();
        assert_eq!(err.to_string(), "unknown operator: core.nope");

        let err = registry.eval("core.extract", &[]).unwrap_err();
        assert!(err.to_string().contains("expected 1 arguments, got 0"));
        let err = registry.eval("core.group_by_indices", &[]).unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_unique_uses_configured_default_sort() {
        let x = DataSlice::flat(
            DataSliceImpl::from_items([3, 1, 3].map(DataItem::from)),
            DType::Int32.into(),
        );
        let unsorted = OperatorRegistry::default()
            .eval("core.unique", &[x.clone()])
            .unwrap();
        assert_eq!(
            unsorted.to_slice_impl(),
            DataSliceImpl::from_items([3, 1].map(DataItem::from))
        );

        let mut config = Config::default();
        config.group_by.default_sort = true;
        let sorted = OperatorRegistry::new(config).eval("core.unique", &[x]).unwrap();
        assert_eq!(
            sorted.to_slice_impl(),
            DataSliceImpl::from_items([1, 3].map(DataItem::from))
        );
    }

    #[test]
    fn test_nofollow_operators() {
        let registry = OperatorRegistry::default();
        let schema = DataItem::from(allocate_explicit_schema());
        let x = DataSlice::from_item(DataItem::Missing, schema.clone());
        let nofollow = registry.eval("core.nofollow_schema", &[x]).unwrap();
        assert!(schema::is_nofollow_schema(nofollow.schema()));

        let followed = registry.eval("core.follow", &[nofollow.clone()]).unwrap();
        assert_eq!(followed.schema(), &schema);

        let schema_item = nofollow.schema_slice();
        let original = registry
            .eval("core.get_nofollowed_schema", &[schema_item])
            .unwrap();
        assert_eq!(original.item(), Some(&schema));
    }

    #[test]
    fn test_store_config_reaches_extract_and_clone() {
        use crate::data_bag::{DataBag, DataBagImpl};

        let mut config = Config::default();
        config.store.initial_capacity = 64;
        assert_eq!(ExtractOp::from_config(&config.store).capacity(), 64);
        assert_eq!(ShallowCloneOp::from_config(&config.store).capacity(), 64);
        assert_eq!(CloneOp::from_config(&config.store).capacity(), 64);

        let obj = DataSliceImpl::allocate_empty_objects(1).get(0);
        let schema = allocate_explicit_schema();
        let mut db = DataBagImpl::new();
        db.set_schema_attr(schema, "v", DType::Int32.into()).unwrap();
        db.set_attr(obj.as_object_id().unwrap(), "v", 1.into());
        let ds = DataSlice::from_item(obj, schema.into()).with_bag(Some(DataBag::from_impl(db)));

        let registry = OperatorRegistry::new(config);
        for name in ["core.extract", "core.shallow_clone", "core.clone"] {
            let result = registry.eval(name, &[ds.clone()]).unwrap();
            let id = result.item().and_then(DataItem::as_object_id).unwrap();
            assert_eq!(
                result.bag().unwrap().read().get_attr(id, "v", &[]),
                DataItem::from(1),
                "{name}"
            );
        }
    }
}
