use crate::client::{AlarmFilter, DataFormat, DataQuery, NetdataClient};
use crate::host::HostPolicy;
use crate::resample::Frequency;
use crate::time::TimeRef;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use vigil_core::{VigilError, VigilResult};
use vigil_skills::params::{bool_arg, int_arg, str_arg};
use vigil_skills::{Arguments, OperationSkill, ParamKind, ParamSpec, SkillDescriptor, SkillRegistry};

/// Name of the base-URL parameter every netdata tool takes.
pub const HOST_PARAM: &str = "netdata_host_url";

/// Shared state handed to every netdata tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub client: Arc<NetdataClient>,
    pub policy: Arc<HostPolicy>,
}

impl ToolContext {
    pub fn new(client: NetdataClient, policy: HostPolicy) -> Self {
        Self {
            client: Arc::new(client),
            policy: Arc::new(policy),
        }
    }
}

/// Register every netdata tool.
pub fn register_netdata_tools(registry: &mut SkillRegistry, ctx: &ToolContext) {
    for tool in netdata_tools(ctx) {
        registry.register(Arc::new(tool));
    }
}

/// The netdata tool table.
pub fn netdata_tools(ctx: &ToolContext) -> Vec<OperationSkill> {
    vec![
        tool(
            SkillDescriptor::new(
                "get_info",
                "Get a summary of the Netdata node: version, hostname, operating system, \
                 cores, total disk space, total RAM, mirrored hosts, alarm counts and collectors.",
            ),
            ctx,
            |ctx, base, _args| async move { ctx.client.info(&base).await },
        ),
        tool(
            SkillDescriptor::new(
                "get_charts",
                "List the charts available on the node as id, name and title.",
            )
            .param(ParamSpec::optional(
                "search_term",
                ParamKind::String,
                json!(""),
                "Only return charts whose id, name, title or dimension names contain this text.",
            ))
            .param(ParamSpec::optional(
                "include_dimensions",
                ParamKind::Boolean,
                json!(false),
                "Also list the dimensions of each chart.",
            )),
            ctx,
            |ctx, base, args| async move {
                let search = str_arg(&args, "search_term")?;
                ctx.client
                    .charts(&base, Some(search), bool_arg(&args, "include_dimensions"))
                    .await
            },
        ),
        tool(
            SkillDescriptor::new(
                "get_chart_info",
                "Get metadata of one chart: title, units, family, context, dimensions and alarms.",
            )
            .param(ParamSpec::required(
                "chart",
                ParamKind::String,
                "Chart id, e.g. 'system.cpu'.",
            )),
            ctx,
            |ctx, base, args| async move {
                let chart = str_arg(&args, "chart")?;
                ctx.client.chart_info(&base, chart).await
            },
        ),
        tool(
            SkillDescriptor::new(
                "get_chart_data",
                "Get the values of one chart over a time window. Returns labels and rows, \
                 the first column being the time.",
            )
            .param(ParamSpec::required(
                "chart",
                ParamKind::String,
                "Chart id, e.g. 'system.cpu'.",
            ))
            .param(ParamSpec::optional(
                "after",
                ParamKind::Time,
                json!(-60),
                "Start: seconds relative to now (negative), a unix timestamp, or an RFC 3339 date.",
            ))
            .param(ParamSpec::optional(
                "before",
                ParamKind::Time,
                json!(0),
                "End: 'now' or 0, seconds relative to now, a unix timestamp, or an RFC 3339 date.",
            ))
            .param(ParamSpec::optional(
                "points",
                ParamKind::Integer,
                json!(60),
                "Number of points the node aggregates the window into.",
            ))
            .param(ParamSpec::optional(
                "options",
                ParamKind::String,
                json!(""),
                "Extra Netdata data options, e.g. 'anomaly-bit' for anomaly rates.",
            ))
            .param(ParamSpec::optional(
                "df_freq",
                ParamKind::String,
                json!(""),
                "Optional resampling period applied to the rows, e.g. '5s', '1min', '1h'.",
            ))
            .param(ParamSpec::optional(
                "format",
                ParamKind::String,
                json!("json"),
                "Body format requested from the node: 'json' or 'csv'. The result shape is the same.",
            )),
            ctx,
            |ctx, base, args| async move {
                let query = data_query(&args)?;
                ctx.client.chart_data(&base, &query).await
            },
        ),
        tool(
            SkillDescriptor::new(
                "get_alarms",
                "List alarms with name, chart, status, value and info. By default only \
                 raised alarms are returned.",
            )
            .param(ParamSpec::optional(
                "all",
                ParamKind::Boolean,
                json!(false),
                "Return every configured alarm.",
            ))
            .param(ParamSpec::optional(
                "active",
                ParamKind::Boolean,
                json!(false),
                "Return only alarms in warning or critical state.",
            )),
            ctx,
            |ctx, base, args| async move {
                let filter = AlarmFilter::from_flags(bool_arg(&args, "all"), bool_arg(&args, "active"));
                ctx.client.alarms(&base, filter).await
            },
        ),
        tool(
            SkillDescriptor::new(
                "get_current_metrics",
                "Get the latest value of every dimension of every chart, with units.",
            )
            .param(ParamSpec::optional(
                "search_term",
                ParamKind::String,
                json!(""),
                "Only return charts whose id contains this text.",
            )),
            ctx,
            |ctx, base, args| async move {
                let search = str_arg(&args, "search_term")?;
                ctx.client.current_metrics(&base, Some(search)).await
            },
        ),
        tool(
            SkillDescriptor::new(
                "get_anomaly_rates",
                "Get the mean anomaly rate (percent of anomalous samples) of each chart over \
                 a time window, highest first. Optionally only charts matching search_term.",
            )
            .param(ParamSpec::optional(
                "after",
                ParamKind::Time,
                json!(-3600),
                "Start: seconds relative to now (negative), a unix timestamp, or an RFC 3339 date.",
            ))
            .param(ParamSpec::optional(
                "before",
                ParamKind::Time,
                json!(0),
                "End: 'now' or 0, seconds relative to now, a unix timestamp, or an RFC 3339 date.",
            ))
            .param(ParamSpec::optional(
                "search_term",
                ParamKind::String,
                json!(""),
                "Only rate charts whose id, name, title or dimension names contain this text.",
            )),
            ctx,
            |ctx, base, args| async move {
                let after = TimeRef::parse(args.get("after").unwrap_or(&Value::Null))?;
                let before = TimeRef::parse(args.get("before").unwrap_or(&Value::Null))?;
                let search = str_arg(&args, "search_term")?;
                ctx.client.anomaly_rates(&base, Some(search), after, before).await
            },
        ),
    ]
}

/// Build one tool: prepend the host parameter, check the host against the
/// policy, run `op`, and pretty-print its JSON.
fn tool<F, Fut>(descriptor: SkillDescriptor, ctx: &ToolContext, op: F) -> OperationSkill
where
    F: Fn(ToolContext, String, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = VigilResult<Value>> + Send + 'static,
{
    let mut descriptor = descriptor;
    descriptor.parameters.insert(
        0,
        ParamSpec::required(
            HOST_PARAM,
            ParamKind::String,
            "Base URL of the Netdata node, e.g. 'http://localhost:19999'.",
        ),
    );

    let ctx = ctx.clone();
    OperationSkill::new(descriptor, move |args| {
        let ctx = ctx.clone();
        let pending = str_arg(&args, HOST_PARAM)
            .and_then(|host| ctx.policy.check(host))
            .map(|base| op(ctx, base, args));
        async move {
            let value = pending?.await?;
            Ok::<_, VigilError>(serde_json::to_string_pretty(&value)?)
        }
    })
}

fn data_query(args: &Arguments) -> VigilResult<DataQuery> {
    let points = int_arg(args, "points")?;
    let points = u32::try_from(points)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| VigilError::Validation(format!("points must be positive, got {points}")))?;

    let options = str_arg(args, "options")?.trim();
    let freq = str_arg(args, "df_freq")?.trim();

    let mut query = DataQuery::new(str_arg(args, "chart")?);
    query.after = TimeRef::parse(args.get("after").unwrap_or(&Value::Null))?;
    query.before = TimeRef::parse(args.get("before").unwrap_or(&Value::Null))?;
    query.points = points;
    query.format = DataFormat::parse(str_arg(args, "format")?)?;
    query.options = (!options.is_empty()).then(|| options.to_string());
    query.resample = if freq.is_empty() {
        None
    } else {
        Some(Frequency::parse(freq)?)
    };
    Ok(query)
}
