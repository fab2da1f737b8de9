pub mod policies;
pub mod project;

pub use policies::{
    AccessRuleSpec, ColumnSpec, ConditionSpec, DatasetSpec, MaskingPolicySpec, MaskingRuleSpec,
    PolicyDocument, ProjectConfig, RoleSpec, RowAccessPolicySpec, RowFilterSpec, TagSpec,
    TransformSpec,
};
pub use project::{find_main_config, load_project_config, load_snapshot};
