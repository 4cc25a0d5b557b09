//! Protection group resource implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceMetadataRequest,
    ResourceMetadataResponse, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, StringOneOf};

use super::common::{
    api_error, block_list, blocks, bool_at, composite_id, first_block, i64_at, import_tenant_scoped,
    instance_attributes, instance_client, key_values, key_values_at, not_configured, object, opt,
    parse_composite_id, provider_data, set, string_at, string_list, strings_at,
};
use crate::api::protection_groups::{
    AlertTarget, AlertingPolicy, FilePath, FileProtectionObject, FileProtectionTypeParams,
    MissingEntity, OracleDatabaseHost, OracleDbChannel, OracleDbParams, OracleParams,
    OracleProtectionObject, PhysicalParams, ProtectionGroup, ProtectionGroupRequest, SlaRule,
    TimeOfDay, VlanParams, VolumeProtectionObject, VolumeProtectionTypeParams,
};
use crate::BackupRecoveryProviderData;

pub const ENVIRONMENTS: [&str; 2] = ["kOracle", "kPhysical"];
const PRIORITIES: [&str; 3] = ["kHigh", "kLow", "kMedium"];
const QOS_POLICIES: [&str; 4] = ["kBackupAll", "kBackupHDD", "kBackupSSD", "kTestAndDevHigh"];
const PROTECTION_TYPES: [&str; 2] = ["kFile", "kVolume"];
const DEFAULT_TIME_ZONE: &str = "America/Los_Angeles";

#[derive(Default)]
pub struct ProtectionGroupResource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl ProtectionGroupResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn entity_type() -> AttributeType {
    AttributeType::list(AttributeType::object([
        ("id", AttributeType::Number),
        ("name", AttributeType::String),
        ("parent_source_id", AttributeType::Number),
        ("parent_source_name", AttributeType::String),
    ]))
}

pub fn protection_group_schema() -> Schema {
    let builder = SchemaBuilder::new()
        .version(0)
        .description("Manages a protection group: a set of objects backed up under one policy")
        .attribute(
            AttributeBuilder::string("id")
                .description("Composite ID: <tenant_id>::<group_id>")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("x_ibm_tenant_id")
                .description("Tenant that owns the group")
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("name")
                .description("Name of the protection group")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::string("policy_id")
                .description("Protection policy applied to the group")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::string("environment")
                .description("Environment of the protected objects")
                .required()
                .validator(StringOneOf::create(&ENVIRONMENTS))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("priority")
                .description("Priority of the group")
                .optional()
                .validator(StringOneOf::create(&PRIORITIES))
                .build(),
        )
        .attribute(
            AttributeBuilder::number("storage_domain_id")
                .description("Storage domain the backups are written to")
                .optional()
                .build(),
        )
        .attribute(AttributeBuilder::string("description").optional().build())
        .attribute(
            AttributeBuilder::number("end_time_usecs")
                .description("Time after which no more runs are started")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::string("qos_policy")
                .description("QoS policy for writes to the cluster")
                .optional()
                .validator(StringOneOf::create(&QOS_POLICIES))
                .build(),
        )
        .attribute(AttributeBuilder::bool("abort_in_blackouts").optional().build())
        .attribute(AttributeBuilder::bool("pause_in_blackouts").optional().build())
        .attribute(AttributeBuilder::bool("is_paused").optional().build())
        .attribute(
            AttributeBuilder::string("group_id")
                .description("ID of the group as assigned by the service")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("cluster_id")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("region_id")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(AttributeBuilder::bool("is_active").computed().build())
        .attribute(AttributeBuilder::bool("is_deleted").computed().build())
        .attribute(AttributeBuilder::bool("is_protect_once").computed().build())
        .attribute(AttributeBuilder::number("num_protected_objects").computed().build())
        .attribute(
            AttributeBuilder::number("last_modified_timestamp_usecs")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "permissions",
                AttributeType::list(AttributeType::object([
                    ("id", AttributeType::String),
                    ("name", AttributeType::String),
                    ("type", AttributeType::String),
                ])),
            )
            .description("Tenants with access to the group")
            .computed()
            .build(),
        )
        .attribute(
            AttributeBuilder::new("missing_entities", entity_type())
                .description("Protected objects that no longer exist on the source")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("invalid_entities", entity_type())
                .computed()
                .build(),
        )
        .block(
            NestedBlockBuilder::list("start_time")
                .description("Time of day the first run of the day starts")
                .max_items(1)
                .attribute(
                    AttributeBuilder::number("hour")
                        .required()
                        .validator(NumberRangeValidator::between(0.0, 23.0))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::number("minute")
                        .required()
                        .validator(NumberRangeValidator::between(0.0, 59.0))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::string("time_zone")
                        .optional()
                        .computed()
                        .default(StaticDefault::string(DEFAULT_TIME_ZONE))
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::list("alert_policy")
                .max_items(1)
                .attribute(
                    AttributeBuilder::string_list("backup_run_status")
                        .description("Run outcomes that raise an alert: kSuccess, kFailure, kSlaViolation, kWarning")
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::bool("raise_object_level_failure_alert")
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::bool("raise_object_level_failure_alert_after_last_attempt")
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::bool("raise_object_level_failure_alert_after_each_attempt")
                        .optional()
                        .build(),
                )
                .block(
                    NestedBlockBuilder::list("alert_targets")
                        .attribute(AttributeBuilder::string("email_address").required().build())
                        .attribute(
                            AttributeBuilder::string("language")
                                .optional()
                                .validator(StringOneOf::create(&["en-us", "ja-jp", "zh-cn"]))
                                .build(),
                        )
                        .attribute(
                            AttributeBuilder::string("recipient_type")
                                .optional()
                                .validator(StringOneOf::create(&["kTo", "kCc"]))
                                .build(),
                        )
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::list("sla")
                .attribute(
                    AttributeBuilder::string("backup_run_type")
                        .optional()
                        .validator(StringOneOf::create(&["kIncremental", "kFull", "kLog"]))
                        .build(),
                )
                .attribute(AttributeBuilder::number("sla_minutes").optional().build())
                .build(),
        )
        .block(
            NestedBlockBuilder::list("advanced_configs")
                .attribute(AttributeBuilder::string("key").required().build())
                .attribute(AttributeBuilder::string("value").required().build())
                .build(),
        )
        .block(physical_params_block())
        .block(oracle_params_block());

    instance_attributes(builder).build()
}

fn physical_params_block() -> tfplug::schema::NestedBlock {
    let file_paths = NestedBlockBuilder::list("file_paths")
        .attribute(AttributeBuilder::string("included_path").required().build())
        .attribute(AttributeBuilder::string_list("excluded_paths").optional().build())
        .attribute(AttributeBuilder::bool("skip_nested_volumes").optional().build())
        .build();

    let file_params = NestedBlockBuilder::list("file_protection_type_params")
        .max_items(1)
        .block(
            NestedBlockBuilder::list("objects")
                .min_items(1)
                .attribute(AttributeBuilder::number("id").required().build())
                .attribute(AttributeBuilder::string("name").computed().build())
                .block(file_paths)
                .build(),
        )
        .build();

    let volume_params = NestedBlockBuilder::list("volume_protection_type_params")
        .max_items(1)
        .block(
            NestedBlockBuilder::list("objects")
                .min_items(1)
                .attribute(AttributeBuilder::number("id").required().build())
                .attribute(AttributeBuilder::string("name").computed().build())
                .attribute(AttributeBuilder::string_list("volume_guids").optional().build())
                .attribute(AttributeBuilder::bool("enable_system_backup").optional().build())
                .build(),
        )
        .build();

    NestedBlockBuilder::list("physical_params")
        .description("Parameters for kPhysical groups")
        .max_items(1)
        .attribute(
            AttributeBuilder::string("protection_type")
                .required()
                .validator(StringOneOf::create(&PROTECTION_TYPES))
                .build(),
        )
        .block(file_params)
        .block(volume_params)
        .build()
}

fn oracle_params_block() -> tfplug::schema::NestedBlock {
    let node_list = NestedBlockBuilder::list("database_node_list")
        .attribute(AttributeBuilder::string("host_id").optional().build())
        .attribute(AttributeBuilder::number("channel_count").optional().build())
        .attribute(AttributeBuilder::number("port").optional().build())
        .build();

    let db_channels = NestedBlockBuilder::list("db_channels")
        .attribute(AttributeBuilder::number("archive_log_retention_days").optional().build())
        .attribute(AttributeBuilder::number("archive_log_retention_hours").optional().build())
        .attribute(AttributeBuilder::string("database_unique_name").optional().build())
        .attribute(AttributeBuilder::string("database_uuid").optional().build())
        .attribute(AttributeBuilder::number("default_channel_count").optional().build())
        .attribute(AttributeBuilder::number("max_host_count").optional().build())
        .attribute(AttributeBuilder::bool("enable_dg_primary_backup").optional().build())
        .attribute(AttributeBuilder::string("rman_backup_type").optional().build())
        .block(node_list)
        .build();

    let db_params = NestedBlockBuilder::list("db_params")
        .attribute(AttributeBuilder::number("database_id").optional().build())
        .attribute(AttributeBuilder::string("database_name").optional().build())
        .block(db_channels)
        .build();

    let vlan_params = NestedBlockBuilder::list("vlan_params")
        .max_items(1)
        .attribute(AttributeBuilder::number("vlan_id").optional().build())
        .attribute(AttributeBuilder::bool("disable_vlan").optional().build())
        .attribute(AttributeBuilder::string("interface_name").optional().build())
        .build();

    NestedBlockBuilder::list("oracle_params")
        .description("Parameters for kOracle groups")
        .max_items(1)
        .attribute(AttributeBuilder::bool("persist_mountpoints").optional().build())
        .attribute(AttributeBuilder::number("log_auto_kill_timeout_secs").optional().build())
        .attribute(AttributeBuilder::number("incr_auto_kill_timeout_secs").optional().build())
        .attribute(AttributeBuilder::number("full_auto_kill_timeout_secs").optional().build())
        .block(
            NestedBlockBuilder::list("objects")
                .min_items(1)
                .attribute(AttributeBuilder::number("source_id").required().build())
                .attribute(
                    AttributeBuilder::string("source_name")
                        .optional()
                        .computed()
                        .build(),
                )
                .block(db_params)
                .build(),
        )
        .block(vlan_params)
        .build()
}

/// Builds the create/update body from configuration
pub fn build_request(config: &DynamicValue) -> Result<ProtectionGroupRequest, Diagnostic> {
    let required = |name: &str| {
        string_at(config, name).ok_or_else(|| {
            Diagnostic::error(
                format!("Missing {}", name),
                format!("The '{}' attribute is required", name),
            )
            .with_attribute(AttributePath::new(name))
        })
    };

    Ok(ProtectionGroupRequest {
        name: required("name")?,
        policy_id: required("policy_id")?,
        environment: required("environment")?,
        priority: string_at(config, "priority"),
        storage_domain_id: i64_at(config, "storage_domain_id"),
        description: string_at(config, "description"),
        start_time: first_block(config, "start_time").map(|t| TimeOfDay {
            hour: i64_at(&t, "hour").unwrap_or_default(),
            minute: i64_at(&t, "minute").unwrap_or_default(),
            time_zone: string_at(&t, "time_zone"),
        }),
        end_time_usecs: i64_at(config, "end_time_usecs"),
        alert_policy: first_block(config, "alert_policy").map(|p| alert_policy_from(&p)),
        sla: {
            let rules: Vec<SlaRule> = blocks(config, "sla")
                .iter()
                .map(|rule| SlaRule {
                    backup_run_type: string_at(rule, "backup_run_type"),
                    sla_minutes: i64_at(rule, "sla_minutes"),
                })
                .collect();
            (!rules.is_empty()).then_some(rules)
        },
        qos_policy: string_at(config, "qos_policy"),
        abort_in_blackouts: bool_at(config, "abort_in_blackouts"),
        pause_in_blackouts: bool_at(config, "pause_in_blackouts"),
        is_paused: bool_at(config, "is_paused"),
        advanced_configs: key_values_at(config, "advanced_configs"),
        physical_params: first_block(config, "physical_params").map(|p| physical_params_from(&p)),
        oracle_params: first_block(config, "oracle_params").map(|p| oracle_params_from(&p)),
    })
}

fn alert_policy_from(policy: &DynamicValue) -> AlertingPolicy {
    let targets: Vec<AlertTarget> = blocks(policy, "alert_targets")
        .iter()
        .filter_map(|t| {
            Some(AlertTarget {
                email_address: string_at(t, "email_address")?,
                language: string_at(t, "language"),
                recipient_type: string_at(t, "recipient_type"),
            })
        })
        .collect();

    AlertingPolicy {
        backup_run_status: strings_at(policy, "backup_run_status").unwrap_or_default(),
        alert_targets: (!targets.is_empty()).then_some(targets),
        raise_object_level_failure_alert: bool_at(policy, "raise_object_level_failure_alert"),
        raise_object_level_failure_alert_after_last_attempt: bool_at(
            policy,
            "raise_object_level_failure_alert_after_last_attempt",
        ),
        raise_object_level_failure_alert_after_each_attempt: bool_at(
            policy,
            "raise_object_level_failure_alert_after_each_attempt",
        ),
    }
}

fn physical_params_from(params: &DynamicValue) -> PhysicalParams {
    let file_protection_type_params =
        first_block(params, "file_protection_type_params").map(|p| FileProtectionTypeParams {
            objects: blocks(&p, "objects")
                .iter()
                .map(|o| FileProtectionObject {
                    id: i64_at(o, "id").unwrap_or_default(),
                    name: None,
                    file_paths: {
                        let paths: Vec<FilePath> = blocks(o, "file_paths")
                            .iter()
                            .filter_map(|fp| {
                                Some(FilePath {
                                    included_path: string_at(fp, "included_path")?,
                                    excluded_paths: strings_at(fp, "excluded_paths"),
                                    skip_nested_volumes: bool_at(fp, "skip_nested_volumes"),
                                })
                            })
                            .collect();
                        (!paths.is_empty()).then_some(paths)
                    },
                })
                .collect(),
        });

    let volume_protection_type_params =
        first_block(params, "volume_protection_type_params").map(|p| VolumeProtectionTypeParams {
            objects: blocks(&p, "objects")
                .iter()
                .map(|o| VolumeProtectionObject {
                    id: i64_at(o, "id").unwrap_or_default(),
                    name: None,
                    volume_guids: strings_at(o, "volume_guids"),
                    enable_system_backup: bool_at(o, "enable_system_backup"),
                })
                .collect(),
        });

    PhysicalParams {
        protection_type: string_at(params, "protection_type").unwrap_or_default(),
        file_protection_type_params,
        volume_protection_type_params,
    }
}

fn oracle_params_from(params: &DynamicValue) -> OracleParams {
    let channel_from = |c: &DynamicValue| {
        let nodes: Vec<OracleDatabaseHost> = blocks(c, "database_node_list")
            .iter()
            .map(|n| OracleDatabaseHost {
                host_id: string_at(n, "host_id"),
                channel_count: i64_at(n, "channel_count"),
                port: i64_at(n, "port"),
            })
            .collect();
        OracleDbChannel {
            archive_log_retention_days: i64_at(c, "archive_log_retention_days"),
            archive_log_retention_hours: i64_at(c, "archive_log_retention_hours"),
            database_unique_name: string_at(c, "database_unique_name"),
            database_uuid: string_at(c, "database_uuid"),
            default_channel_count: i64_at(c, "default_channel_count"),
            database_node_list: (!nodes.is_empty()).then_some(nodes),
            max_host_count: i64_at(c, "max_host_count"),
            enable_dg_primary_backup: bool_at(c, "enable_dg_primary_backup"),
            rman_backup_type: string_at(c, "rman_backup_type"),
        }
    };

    let objects = blocks(params, "objects")
        .iter()
        .map(|o| {
            let db_params: Vec<OracleDbParams> = blocks(o, "db_params")
                .iter()
                .map(|d| {
                    let channels: Vec<OracleDbChannel> =
                        blocks(d, "db_channels").iter().map(channel_from).collect();
                    OracleDbParams {
                        database_id: i64_at(d, "database_id"),
                        database_name: string_at(d, "database_name"),
                        db_channels: (!channels.is_empty()).then_some(channels),
                    }
                })
                .collect();
            OracleProtectionObject {
                source_id: i64_at(o, "source_id").unwrap_or_default(),
                source_name: string_at(o, "source_name"),
                db_params: (!db_params.is_empty()).then_some(db_params),
            }
        })
        .collect();

    OracleParams {
        objects,
        persist_mountpoints: bool_at(params, "persist_mountpoints"),
        vlan_params: first_block(params, "vlan_params").map(|v| VlanParams {
            vlan_id: i64_at(&v, "vlan_id"),
            disable_vlan: bool_at(&v, "disable_vlan"),
            interface_name: string_at(&v, "interface_name"),
        }),
        log_auto_kill_timeout_secs: i64_at(params, "log_auto_kill_timeout_secs"),
        incr_auto_kill_timeout_secs: i64_at(params, "incr_auto_kill_timeout_secs"),
        full_auto_kill_timeout_secs: i64_at(params, "full_auto_kill_timeout_secs"),
    }
}

fn oracle_params_value(params: &OracleParams) -> Dynamic {
    let channel_value = |c: &OracleDbChannel| {
        object([
            ("archive_log_retention_days", opt(c.archive_log_retention_days)),
            ("archive_log_retention_hours", opt(c.archive_log_retention_hours)),
            ("database_unique_name", opt(c.database_unique_name.clone())),
            ("database_uuid", opt(c.database_uuid.clone())),
            ("default_channel_count", opt(c.default_channel_count)),
            ("max_host_count", opt(c.max_host_count)),
            ("enable_dg_primary_backup", opt(c.enable_dg_primary_backup)),
            ("rman_backup_type", opt(c.rman_backup_type.clone())),
            (
                "database_node_list",
                block_list(c.database_node_list.as_deref(), |n| {
                    object([
                        ("host_id", opt(n.host_id.clone())),
                        ("channel_count", opt(n.channel_count)),
                        ("port", opt(n.port)),
                    ])
                }),
            ),
        ])
    };

    let vlan = params.vlan_params.as_ref().map(|v| {
        object([
            ("vlan_id", opt(v.vlan_id)),
            ("disable_vlan", opt(v.disable_vlan)),
            ("interface_name", opt(v.interface_name.clone())),
        ])
    });

    object([
        ("persist_mountpoints", opt(params.persist_mountpoints)),
        ("log_auto_kill_timeout_secs", opt(params.log_auto_kill_timeout_secs)),
        ("incr_auto_kill_timeout_secs", opt(params.incr_auto_kill_timeout_secs)),
        ("full_auto_kill_timeout_secs", opt(params.full_auto_kill_timeout_secs)),
        (
            "objects",
            block_list(Some(&params.objects), |o| {
                object([
                    ("source_id", Dynamic::from(o.source_id)),
                    ("source_name", opt(o.source_name.clone())),
                    (
                        "db_params",
                        block_list(o.db_params.as_deref(), |d| {
                            object([
                                ("database_id", opt(d.database_id)),
                                ("database_name", opt(d.database_name.clone())),
                                ("db_channels", block_list(d.db_channels.as_deref(), channel_value)),
                            ])
                        }),
                    ),
                ])
            }),
        ),
        ("vlan_params", Dynamic::List(vlan.into_iter().collect())),
    ])
}

fn entities(list: Option<&[MissingEntity]>) -> Dynamic {
    block_list(list, |e| {
        object([
            ("id", opt(e.id)),
            ("name", opt(e.name.clone())),
            ("parent_source_id", opt(e.parent_source_id)),
            ("parent_source_name", opt(e.parent_source_name.clone())),
        ])
    })
}

fn physical_params_value(params: &PhysicalParams) -> Dynamic {
    let file = params.file_protection_type_params.as_ref().map(|p| {
        object([(
            "objects",
            block_list(Some(&p.objects), |o| {
                object([
                    ("id", Dynamic::from(o.id)),
                    ("name", opt(o.name.clone())),
                    (
                        "file_paths",
                        block_list(o.file_paths.as_deref(), |fp| {
                            object([
                                ("included_path", Dynamic::String(fp.included_path.clone())),
                                ("excluded_paths", string_list(fp.excluded_paths.clone())),
                                ("skip_nested_volumes", opt(fp.skip_nested_volumes)),
                            ])
                        }),
                    ),
                ])
            }),
        )])
    });
    let volume = params.volume_protection_type_params.as_ref().map(|p| {
        object([(
            "objects",
            block_list(Some(&p.objects), |o| {
                object([
                    ("id", Dynamic::from(o.id)),
                    ("name", opt(o.name.clone())),
                    ("volume_guids", string_list(o.volume_guids.clone())),
                    ("enable_system_backup", opt(o.enable_system_backup)),
                ])
            }),
        )])
    });

    object([
        ("protection_type", Dynamic::String(params.protection_type.clone())),
        ("file_protection_type_params", Dynamic::List(file.into_iter().collect())),
        ("volume_protection_type_params", Dynamic::List(volume.into_iter().collect())),
    ])
}

/// Copies a group returned by the service into `state`
pub fn apply_group(state: &mut DynamicValue, group: &ProtectionGroup) -> Result<(), Diagnostic> {
    let spec = &group.spec;

    set(state, "group_id", Dynamic::String(group.id.clone()))?;
    set(state, "name", Dynamic::String(spec.name.clone()))?;
    set(state, "policy_id", Dynamic::String(spec.policy_id.clone()))?;
    set(state, "environment", Dynamic::String(spec.environment.clone()))?;
    if let Some(priority) = &spec.priority {
        set(state, "priority", Dynamic::String(priority.clone()))?;
    }
    if let Some(id) = spec.storage_domain_id {
        set(state, "storage_domain_id", Dynamic::from(id))?;
    }
    if let Some(description) = &spec.description {
        set(state, "description", Dynamic::String(description.clone()))?;
    }
    if let Some(end) = spec.end_time_usecs {
        set(state, "end_time_usecs", Dynamic::from(end))?;
    }
    if let Some(qos) = &spec.qos_policy {
        set(state, "qos_policy", Dynamic::String(qos.clone()))?;
    }
    for (name, value) in [
        ("abort_in_blackouts", spec.abort_in_blackouts),
        ("pause_in_blackouts", spec.pause_in_blackouts),
        ("is_paused", spec.is_paused),
    ] {
        if let Some(value) = value {
            set(state, name, Dynamic::Bool(value))?;
        }
    }

    if let Some(start) = &spec.start_time {
        set(
            state,
            "start_time",
            Dynamic::List(vec![object([
                ("hour", Dynamic::from(start.hour)),
                ("minute", Dynamic::from(start.minute)),
                (
                    "time_zone",
                    Dynamic::String(
                        start
                            .time_zone
                            .clone()
                            .unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string()),
                    ),
                ),
            ])]),
        )?;
    }
    if let Some(policy) = &spec.alert_policy {
        set(
            state,
            "alert_policy",
            Dynamic::List(vec![object([
                ("backup_run_status", string_list(Some(policy.backup_run_status.clone()))),
                (
                    "raise_object_level_failure_alert",
                    opt(policy.raise_object_level_failure_alert),
                ),
                (
                    "raise_object_level_failure_alert_after_last_attempt",
                    opt(policy.raise_object_level_failure_alert_after_last_attempt),
                ),
                (
                    "raise_object_level_failure_alert_after_each_attempt",
                    opt(policy.raise_object_level_failure_alert_after_each_attempt),
                ),
                (
                    "alert_targets",
                    block_list(policy.alert_targets.as_deref(), |t| {
                        object([
                            ("email_address", Dynamic::String(t.email_address.clone())),
                            ("language", opt(t.language.clone())),
                            ("recipient_type", opt(t.recipient_type.clone())),
                        ])
                    }),
                ),
            ])]),
        )?;
    }
    if let Some(sla) = &spec.sla {
        set(
            state,
            "sla",
            block_list(Some(sla), |rule| {
                object([
                    ("backup_run_type", opt(rule.backup_run_type.clone())),
                    ("sla_minutes", opt(rule.sla_minutes)),
                ])
            }),
        )?;
    }
    if let Some(configs) = &spec.advanced_configs {
        set(state, "advanced_configs", key_values(Some(configs)))?;
    }
    if let Some(params) = &spec.physical_params {
        set(
            state,
            "physical_params",
            Dynamic::List(vec![physical_params_value(params)]),
        )?;
    }
    if let Some(params) = &spec.oracle_params {
        set(
            state,
            "oracle_params",
            Dynamic::List(vec![oracle_params_value(params)]),
        )?;
    }

    set(state, "cluster_id", opt(group.cluster_id.clone()))?;
    set(state, "region_id", opt(group.region_id.clone()))?;
    set(state, "is_active", opt(group.is_active))?;
    set(state, "is_deleted", opt(group.is_deleted))?;
    set(state, "is_protect_once", opt(group.is_protect_once))?;
    set(state, "num_protected_objects", opt(group.num_protected_objects))?;
    set(
        state,
        "last_modified_timestamp_usecs",
        opt(group.last_modified_timestamp_usecs),
    )?;
    set(
        state,
        "permissions",
        block_list(group.permissions.as_deref(), |p| {
            object([
                ("id", opt(p.id.clone())),
                ("name", opt(p.name.clone())),
                ("type", opt(p.permission_type.clone())),
            ])
        }),
    )?;
    set(state, "missing_entities", entities(group.missing_entities.as_deref()))?;
    set(state, "invalid_entities", entities(group.invalid_entities.as_deref()))?;
    Ok(())
}

#[async_trait]
impl Resource for ProtectionGroupResource {
    fn type_name(&self) -> &str {
        "ibm_protection_group"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: protection_group_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        let config = &request.config;

        let environment = string_at(config, "environment");
        if environment.as_deref() == Some("kOracle") && first_block(config, "oracle_params").is_none()
        {
            diagnostics.push(
                Diagnostic::error(
                    "Missing oracle_params",
                    "kOracle protection groups require an oracle_params block",
                )
                .with_attribute(AttributePath::new("oracle_params")),
            );
        }

        let params = first_block(config, "physical_params");
        if environment.as_deref() == Some("kPhysical") && params.is_none() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing physical_params",
                    "kPhysical protection groups require a physical_params block",
                )
                .with_attribute(AttributePath::new("physical_params")),
            );
        }

        if let Some(params) = params {
            let expected = match string_at(&params, "protection_type").as_deref() {
                Some("kFile") => Some("file_protection_type_params"),
                Some("kVolume") => Some("volume_protection_type_params"),
                _ => None,
            };
            if let Some(block) = expected {
                if first_block(&params, block).is_none() {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("Missing {}", block),
                            format!(
                                "protection_type {} requires a {} block",
                                string_at(&params, "protection_type").unwrap_or_default(),
                                block
                            ),
                        )
                        .with_attribute(
                            AttributePath::new("physical_params").index(0).attribute(block),
                        ),
                    );
                }
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse::failed(not_configured());
        };
        let planned = &request.planned_state;

        let Some(tenant_id) = string_at(planned, "x_ibm_tenant_id") else {
            return CreateResourceResponse::failed(Diagnostic::error(
                "Missing x_ibm_tenant_id",
                "The 'x_ibm_tenant_id' attribute is required",
            ));
        };
        let client = match instance_client(&provider_data.client, planned) {
            Ok(client) => client,
            Err(diag) => return CreateResourceResponse::failed(diag),
        };
        let body = match build_request(planned) {
            Ok(body) => body,
            Err(diag) => return CreateResourceResponse::failed(diag),
        };

        tracing::debug!("creating protection group {} for tenant {}", body.name, tenant_id);
        let created = match client.protection_groups().create(&tenant_id, &body).await {
            Ok(group) => group,
            Err(e) => {
                return CreateResourceResponse::failed(api_error(
                    "Failed to create protection group",
                    &e,
                ))
            }
        };

        let mut diagnostics = vec![];
        let group = match client.protection_groups().get(&tenant_id, &created.id).await {
            Ok(group) => group,
            Err(e) => {
                diagnostics.push(Diagnostic::warning(
                    "Failed to read back protection group",
                    format!("API error: {}", e),
                ));
                created
            }
        };

        let mut state = planned.clone();
        if let Err(diag) = set(
            &mut state,
            "id",
            Dynamic::String(composite_id(&tenant_id, &group.id)),
        )
        .and_then(|_| apply_group(&mut state, &group))
        {
            diagnostics.push(diag);
        }

        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadResourceResponse::failed(request.current_state, not_configured());
        };
        let current = &request.current_state;

        let Some(id) = string_at(current, "id") else {
            return ReadResourceResponse::removed();
        };
        let (tenant_id, group_id) =
            match parse_composite_id(&id, string_at(current, "x_ibm_tenant_id")) {
                Ok(parts) => parts,
                Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
            };
        let client = match instance_client(&provider_data.client, current) {
            Ok(client) => client,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        tracing::debug!("reading protection group {}", group_id);
        match client.protection_groups().get(&tenant_id, &group_id).await {
            Ok(group) if group.is_deleted == Some(true) => {
                tracing::debug!("protection group {} is deleted", group_id);
                ReadResourceResponse::removed()
            }
            Ok(group) => {
                let mut state = request.current_state.clone();
                let result = set(&mut state, "x_ibm_tenant_id", Dynamic::String(tenant_id))
                    .and_then(|_| apply_group(&mut state, &group));
                match result {
                    Ok(()) => ReadResourceResponse::found(state, request.private),
                    Err(diag) => ReadResourceResponse::failed(request.current_state, diag),
                }
            }
            Err(e) if e.is_not_found() => ReadResourceResponse::removed(),
            Err(e) => ReadResourceResponse::failed(
                request.current_state,
                api_error("Failed to read protection group", &e),
            ),
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return UpdateResourceResponse::failed(request.prior_state, not_configured());
        };
        let planned = &request.planned_state;

        let id = string_at(&request.prior_state, "id").unwrap_or_default();
        let (tenant_id, group_id) =
            match parse_composite_id(&id, string_at(planned, "x_ibm_tenant_id")) {
                Ok(parts) => parts,
                Err(diag) => return UpdateResourceResponse::failed(request.prior_state, diag),
            };
        let client = match instance_client(&provider_data.client, planned) {
            Ok(client) => client,
            Err(diag) => return UpdateResourceResponse::failed(request.prior_state, diag),
        };
        let body = match build_request(planned) {
            Ok(body) => body,
            Err(diag) => return UpdateResourceResponse::failed(request.prior_state, diag),
        };

        tracing::debug!("updating protection group {}", group_id);
        match client
            .protection_groups()
            .update(&tenant_id, &group_id, &body)
            .await
        {
            Ok(group) => {
                let mut state = planned.clone();
                let mut diagnostics = vec![];
                if let Err(diag) = set(&mut state, "id", Dynamic::String(id))
                    .and_then(|_| apply_group(&mut state, &group))
                {
                    diagnostics.push(diag);
                }
                UpdateResourceResponse {
                    new_state: state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                }
            }
            Err(e) => UpdateResourceResponse::failed(
                request.prior_state,
                api_error("Failed to update protection group", &e),
            ),
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };
        let prior = &request.prior_state;

        let Some(id) = string_at(prior, "id") else {
            return DeleteResourceResponse { diagnostics: vec![] };
        };
        let (tenant_id, group_id) = match parse_composite_id(&id, string_at(prior, "x_ibm_tenant_id"))
        {
            Ok(parts) => parts,
            Err(diag) => return DeleteResourceResponse { diagnostics: vec![diag] },
        };
        let client = match instance_client(&provider_data.client, prior) {
            Ok(client) => client,
            Err(diag) => return DeleteResourceResponse { diagnostics: vec![diag] },
        };

        tracing::debug!("deleting protection group {}", group_id);
        match client.protection_groups().delete(&tenant_id, &group_id).await {
            Ok(()) => DeleteResourceResponse { diagnostics: vec![] },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics: vec![] },
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![api_error("Failed to delete protection group", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ProtectionGroupResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match provider_data(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for ProtectionGroupResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_tenant_scoped(&request)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn physical_file_config() -> DynamicValue {
        DynamicValue::new(object([
            ("x_ibm_tenant_id", Dynamic::from("tenant-a/")),
            ("name", Dynamic::from("daily-files")),
            ("policy_id", Dynamic::from("policy-1")),
            ("environment", Dynamic::from("kPhysical")),
            ("priority", Dynamic::from("kHigh")),
            ("storage_domain_id", Dynamic::from(3i64)),
            (
                "start_time",
                Dynamic::List(vec![object([
                    ("hour", Dynamic::from(22i64)),
                    ("minute", Dynamic::from(15i64)),
                    ("time_zone", Dynamic::from("UTC")),
                ])]),
            ),
            (
                "alert_policy",
                Dynamic::List(vec![object([
                    ("backup_run_status", Dynamic::List(vec![Dynamic::from("kFailure")])),
                    (
                        "alert_targets",
                        Dynamic::List(vec![object([
                            ("email_address", Dynamic::from("ops@example.com")),
                            ("recipient_type", Dynamic::from("kTo")),
                        ])]),
                    ),
                ])]),
            ),
            (
                "physical_params",
                Dynamic::List(vec![object([
                    ("protection_type", Dynamic::from("kFile")),
                    (
                        "file_protection_type_params",
                        Dynamic::List(vec![object([(
                            "objects",
                            Dynamic::List(vec![object([
                                ("id", Dynamic::from(17i64)),
                                (
                                    "file_paths",
                                    Dynamic::List(vec![object([
                                        ("included_path", Dynamic::from("/var/data")),
                                        ("skip_nested_volumes", Dynamic::Bool(true)),
                                    ])]),
                                ),
                            ])]),
                        )])]),
                    ),
                ])]),
            ),
        ]))
    }

    #[test]
    fn build_request_maps_nested_blocks() {
        let request = build_request(&physical_file_config()).unwrap();

        assert_eq!(request.name, "daily-files");
        assert_eq!(request.priority.as_deref(), Some("kHigh"));
        assert_eq!(request.storage_domain_id, Some(3));
        assert_eq!(
            request.start_time,
            Some(TimeOfDay {
                hour: 22,
                minute: 15,
                time_zone: Some("UTC".to_string()),
            })
        );
        let policy = request.alert_policy.unwrap();
        assert_eq!(policy.backup_run_status, vec!["kFailure"]);
        assert_eq!(policy.alert_targets.unwrap()[0].email_address, "ops@example.com");

        let params = request.physical_params.unwrap();
        assert_eq!(params.protection_type, "kFile");
        let object = &params.file_protection_type_params.unwrap().objects[0];
        assert_eq!(object.id, 17);
        assert_eq!(object.file_paths.as_ref().unwrap()[0].included_path, "/var/data");
        assert!(params.volume_protection_type_params.is_none());
        assert!(request.sla.is_none());
    }

    #[test]
    fn build_request_requires_policy() {
        let mut config = physical_file_config();
        config.set_null(&AttributePath::new("policy_id")).unwrap();
        let diag = build_request(&config).unwrap_err();
        assert_eq!(diag.summary, "Missing policy_id");
    }

    #[test]
    fn apply_group_fills_computed_values() {
        let group: ProtectionGroup = serde_json::from_str(
            r#"{"id":"5:1:42","clusterId":"5","regionId":"us-east","name":"daily-files",
                "policyId":"policy-1","environment":"kPhysical","isActive":true,"isDeleted":false,
                "numProtectedObjects":1,"startTime":{"hour":22,"minute":15},
                "missingEntities":[{"id":9,"name":"gone-host"}]}"#,
        )
        .unwrap();

        let mut state = physical_file_config();
        apply_group(&mut state, &group).unwrap();

        assert_eq!(string_at(&state, "group_id").as_deref(), Some("5:1:42"));
        assert_eq!(string_at(&state, "cluster_id").as_deref(), Some("5"));
        assert_eq!(i64_at(&state, "num_protected_objects"), Some(1));
        let start = first_block(&state, "start_time").unwrap();
        assert_eq!(string_at(&start, "time_zone").as_deref(), Some(DEFAULT_TIME_ZONE));
        let missing = blocks(&state, "missing_entities");
        assert_eq!(string_at(&missing[0], "name").as_deref(), Some("gone-host"));
        assert!(blocks(&state, "permissions").is_empty());
    }

    #[tokio::test]
    async fn validate_requires_params_matching_protection_type() {
        let resource = ProtectionGroupResource::new();
        let mut config = physical_file_config();
        config
            .set_string(
                &AttributePath::new("physical_params")
                    .index(0)
                    .attribute("protection_type"),
                "kVolume".to_string(),
            )
            .unwrap();

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "ibm_protection_group".to_string(),
                    config,
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "Missing volume_protection_type_params"
        );
    }

    fn oracle_config() -> DynamicValue {
        DynamicValue::new(object([
            ("x_ibm_tenant_id", Dynamic::from("tenant-a/")),
            ("name", Dynamic::from("nightly-oracle")),
            ("policy_id", Dynamic::from("policy-1")),
            ("environment", Dynamic::from("kOracle")),
            (
                "oracle_params",
                Dynamic::List(vec![object([
                    ("persist_mountpoints", Dynamic::Bool(true)),
                    (
                        "objects",
                        Dynamic::List(vec![object([
                            ("source_id", Dynamic::from(301i64)),
                            (
                                "db_params",
                                Dynamic::List(vec![object([
                                    ("database_id", Dynamic::from(4400i64)),
                                    (
                                        "db_channels",
                                        Dynamic::List(vec![object([
                                            ("database_unique_name", Dynamic::from("ORCL")),
                                            ("rman_backup_type", Dynamic::from("kImageCopy")),
                                            (
                                                "database_node_list",
                                                Dynamic::List(vec![object([
                                                    ("host_id", Dynamic::from("h-1")),
                                                    ("channel_count", Dynamic::from(4i64)),
                                                ])]),
                                            ),
                                        ])]),
                                    ),
                                ])]),
                            ),
                        ])]),
                    ),
                    (
                        "vlan_params",
                        Dynamic::List(vec![object([("vlan_id", Dynamic::from(12i64))])]),
                    ),
                ])]),
            ),
        ]))
    }

    #[test]
    fn build_request_maps_oracle_channels() {
        let request = build_request(&oracle_config()).unwrap();
        assert!(request.physical_params.is_none());

        let params = request.oracle_params.unwrap();
        assert_eq!(params.persist_mountpoints, Some(true));
        assert_eq!(params.vlan_params.unwrap().vlan_id, Some(12));
        let db = &params.objects[0].db_params.as_ref().unwrap()[0];
        assert_eq!(params.objects[0].source_id, 301);
        assert_eq!(db.database_id, Some(4400));
        let channel = &db.db_channels.as_ref().unwrap()[0];
        assert_eq!(channel.rman_backup_type.as_deref(), Some("kImageCopy"));
        assert_eq!(
            channel.database_node_list.as_ref().unwrap()[0].channel_count,
            Some(4)
        );
    }

    #[test]
    fn apply_group_fills_oracle_source_name() {
        let group: ProtectionGroup = serde_json::from_str(
            r#"{"id":"5:1:77","name":"nightly-oracle","policyId":"policy-1",
                "environment":"kOracle",
                "oracleParams":{"objects":[{"sourceId":301,"sourceName":"ora-host",
                    "dbParams":[{"databaseId":4400,"dbChannels":[{"databaseUniqueName":"ORCL"}]}]}]}}"#,
        )
        .unwrap();

        let mut state = oracle_config();
        apply_group(&mut state, &group).unwrap();

        let params = first_block(&state, "oracle_params").unwrap();
        let object = &blocks(&params, "objects")[0];
        assert_eq!(string_at(object, "source_name").as_deref(), Some("ora-host"));
        let db = &blocks(object, "db_params")[0];
        let channel = &blocks(db, "db_channels")[0];
        assert_eq!(string_at(channel, "database_unique_name").as_deref(), Some("ORCL"));
        assert!(blocks(&params, "vlan_params").is_empty());
    }

    #[tokio::test]
    async fn validate_requires_oracle_params_for_oracle_groups() {
        let resource = ProtectionGroupResource::new();
        let mut config = oracle_config();
        config.set_null(&AttributePath::new("oracle_params")).unwrap();

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "ibm_protection_group".to_string(),
                    config,
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Missing oracle_params");
    }

    #[test]
    fn sql_is_not_a_group_environment() {
        assert!(!ENVIRONMENTS.contains(&"kSQL"));
    }
}
