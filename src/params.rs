use crate::cli::EffectiveConfig;
use crate::model::ReportOptions;
use crate::normalize::FieldMap;
use crate::window::{Granularity, ResolvedWindow};

/// Explicit --grain wins, then the phrase's own grain, then monthly.
pub fn effective_grain(cfg: &EffectiveConfig, window: &ResolvedWindow) -> Granularity {
  cfg.grain.or(window.granularity).unwrap_or(Granularity::Monthly)
}

pub fn build_field_map(cfg: &EffectiveConfig, scope_field: Option<String>) -> FieldMap {
  FieldMap { epic_link_field: cfg.epic_link_field.clone(), scope_field }
}

pub fn build_report_options(cfg: &EffectiveConfig, grain: Granularity, fields: &FieldMap) -> ReportOptions {
  let grain = match grain {
    Granularity::Monthly => "monthly",
    Granularity::Weekly => "weekly",
  };
  ReportOptions {
    grain: grain.into(),
    tz: cfg.tz.to_string(),
    jql_scope: cfg.jql_scope.clone(),
    scope_field: fields.scope_field.clone(),
    epic_link_field: fields.epic_link_field.clone(),
    rollup_scopes: cfg.rollup.as_map().clone(),
  }
}
