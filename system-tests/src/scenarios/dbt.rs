// system-tests/src/scenarios/dbt.rs
// ============================================================================
// Module: s2-dbt
// Description: Filter an employees table with an inline dbt model.
// Purpose: Cover SQL sources and workflow parameters without a service.
// Dependencies: digitalhub-client, serde_json
// ============================================================================

use digitalhub_client::EntityRequest;
use digitalhub_client::ParamSource;
use digitalhub_client::Pipeline;
use digitalhub_client::SourceCode;
use digitalhub_client::Step;
use serde_json::Value;

use super::Scenario;
use super::ScenarioError;
use super::run_workflow;
use crate::context::SuiteContext;

/// Employees table published as a gist.
pub const DATA_URL: &str = "https://gist.githubusercontent.com/kevin336/acbb2271e66c10a5b73aacf82ca82784/raw/e38afe62e088394d61ed30884dd50a6826eee0a8/employees.csv";

/// Keeps employees of department 50.
pub const TRANSFORM_SQL: &str = r#"
WITH tab AS (
    SELECT  *
    FROM    {{ ref('employees') }}
)
SELECT  *
FROM    tab
WHERE   tab."DEPARTMENT_ID" = '50'
"#;

/// Builds the single-step dbt pipeline.
#[must_use]
pub fn pipeline() -> Pipeline {
    let mut pipeline = Pipeline::dag("dag");
    pipeline.step(
        Step::new("transform-employees")
            .action("transform")
            .input("employees", ParamSource::workflow("employees"))
            .outputs(["dataset"]),
    );
    pipeline
}

/// Runs `s2-dbt`.
///
/// # Errors
///
/// Returns [`ScenarioError`] on the first failed step.
pub fn drive(context: &SuiteContext) -> Result<(), ScenarioError> {
    let client = context.client();
    let project = context.project_name();

    let dataitem = client.create(project, EntityRequest::dataitem("employees-data", "table", DATA_URL))?;
    client.create(
        project,
        EntityRequest::function("transform-employees", "dbt").with_source(SourceCode::sql(TRANSFORM_SQL)),
    )?;

    run_workflow(
        context,
        Scenario::S2Dbt,
        "dbt-pipeline",
        &pipeline(),
        &[("employees", Value::String(dataitem.key().to_string()))],
    )?;
    Ok(())
}
