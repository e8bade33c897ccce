//! In-memory definition records
//!
//! One record type per entity kind, mirroring the `define` grammar. Records
//! are created during ingestion, mutated in place by template resolution and
//! duplication, and read-only from group expansion onward. Attribute values
//! are tri-state: never mentioned, explicitly cleared via the `null`
//! sentinel, or set; inheritance decisions depend on the difference.

pub mod options;

pub use options::{
    HostDependencyOpts, HostEscalationOpts, HostNotifyOpts, ServiceDependencyOpts,
    ServiceEscalationOpts, ServiceNotifyOpts,
};

use bitflags::bitflags;

/// Directive value meaning "this attribute was explicitly set to empty".
pub const SENTINEL_NULL: &str = "null";

/// Entity kinds understood by the `define` grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Timeperiod,
    Command,
    Contact,
    Contactgroup,
    Host,
    Hostgroup,
    Service,
    Servicegroup,
    ServiceDependency,
    ServiceEscalation,
    HostDependency,
    HostEscalation,
    HostExtInfo,
    ServiceExtInfo,
}

impl ObjectKind {
    /// Keyword used after `define`.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Timeperiod => "timeperiod",
            ObjectKind::Command => "command",
            ObjectKind::Contact => "contact",
            ObjectKind::Contactgroup => "contactgroup",
            ObjectKind::Host => "host",
            ObjectKind::Hostgroup => "hostgroup",
            ObjectKind::Service => "service",
            ObjectKind::Servicegroup => "servicegroup",
            ObjectKind::ServiceDependency => "servicedependency",
            ObjectKind::ServiceEscalation => "serviceescalation",
            ObjectKind::HostDependency => "hostdependency",
            ObjectKind::HostEscalation => "hostescalation",
            ObjectKind::HostExtInfo => "hostextinfo",
            ObjectKind::ServiceExtInfo => "serviceextinfo",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "timeperiod" => ObjectKind::Timeperiod,
            "command" => ObjectKind::Command,
            "contact" => ObjectKind::Contact,
            "contactgroup" => ObjectKind::Contactgroup,
            "host" => ObjectKind::Host,
            "hostgroup" => ObjectKind::Hostgroup,
            "service" => ObjectKind::Service,
            "servicegroup" => ObjectKind::Servicegroup,
            "servicedependency" => ObjectKind::ServiceDependency,
            "serviceescalation" => ObjectKind::ServiceEscalation,
            "hostdependency" => ObjectKind::HostDependency,
            "hostescalation" => ObjectKind::HostEscalation,
            "hostextinfo" => ObjectKind::HostExtInfo,
            "serviceextinfo" => ObjectKind::ServiceExtInfo,
            _ => return None,
        })
    }

    /// Position of this kind in per-kind tables.
    pub(crate) fn ordinal(self) -> usize {
        match self {
            ObjectKind::Timeperiod => 0,
            ObjectKind::Command => 1,
            ObjectKind::Contact => 2,
            ObjectKind::Contactgroup => 3,
            ObjectKind::Host => 4,
            ObjectKind::Hostgroup => 5,
            ObjectKind::Service => 6,
            ObjectKind::Servicegroup => 7,
            ObjectKind::ServiceDependency => 8,
            ObjectKind::ServiceEscalation => 9,
            ObjectKind::HostDependency => 10,
            ObjectKind::HostEscalation => 11,
            ObjectKind::HostExtInfo => 12,
            ObjectKind::ServiceExtInfo => 13,
        }
    }

    /// Selection bit for this kind.
    pub fn mask(self) -> KindMask {
        match self {
            ObjectKind::Timeperiod => KindMask::TIMEPERIODS,
            ObjectKind::Command => KindMask::COMMANDS,
            ObjectKind::Contact => KindMask::CONTACTS,
            ObjectKind::Contactgroup => KindMask::CONTACTGROUPS,
            ObjectKind::Host => KindMask::HOSTS,
            ObjectKind::Hostgroup => KindMask::HOSTGROUPS,
            ObjectKind::Service => KindMask::SERVICES,
            ObjectKind::Servicegroup => KindMask::SERVICEGROUPS,
            ObjectKind::ServiceDependency => KindMask::SERVICEDEPENDENCIES,
            ObjectKind::ServiceEscalation => KindMask::SERVICEESCALATIONS,
            ObjectKind::HostDependency => KindMask::HOSTDEPENDENCIES,
            ObjectKind::HostEscalation => KindMask::HOSTESCALATIONS,
            ObjectKind::HostExtInfo => KindMask::HOSTEXTINFO,
            ObjectKind::ServiceExtInfo => KindMask::SERVICEEXTINFO,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Which entity kinds a load should parse and register. Read-only
    /// consumers can request a subset (e.g. hosts + services only);
    /// unselected kinds are skipped while parsing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KindMask: u16 {
        const TIMEPERIODS = 0x0001;
        const COMMANDS = 0x0002;
        const CONTACTS = 0x0004;
        const CONTACTGROUPS = 0x0008;
        const HOSTS = 0x0010;
        const HOSTGROUPS = 0x0020;
        const SERVICES = 0x0040;
        const SERVICEGROUPS = 0x0080;
        const SERVICEDEPENDENCIES = 0x0100;
        const SERVICEESCALATIONS = 0x0200;
        const HOSTDEPENDENCIES = 0x0400;
        const HOSTESCALATIONS = 0x0800;
        const HOSTEXTINFO = 0x1000;
        const SERVICEEXTINFO = 0x2000;
    }
}

impl Default for KindMask {
    fn default() -> Self {
        KindMask::all()
    }
}

/// Id of a source file in the session's file-name table.
pub type FileId = usize;

/// Where a record came from, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance {
    pub file: FileId,
    pub line: u32,
}

/// Tri-state attribute value.
///
/// `Cleared` (the `null` sentinel) is not the same as `Unset`: a cleared
/// attribute blocks template inheritance but contributes no value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Attr<T> {
    #[default]
    Unset,
    Cleared,
    Value(T),
}

impl<T> Attr<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Attr::Unset)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Attr::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Adopt the parent's state, but only if this attribute was never set.
    pub fn inherit_from(&mut self, parent: &Attr<T>)
    where
        T: Clone,
    {
        if self.is_unset() && !parent.is_unset() {
            *self = parent.clone();
        }
    }
}

impl Attr<String> {
    /// Store a raw directive value, honoring the `null` sentinel.
    pub fn set_raw(&mut self, raw: &str) {
        if raw == SENTINEL_NULL {
            *self = Attr::Cleared;
        } else {
            *self = Attr::Value(raw.to_string());
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.value().map(String::as_str)
    }
}

/// Comma-joined list attribute with an explicit additive-inheritance flag.
///
/// A leading `+` in the raw directive value marks the list additive; the
/// marker itself is consumed at parse time and only the flag travels with
/// the record. The flag must survive template resolution untouched so the
/// cross-object inheritance pass can still honor it against runtime parents;
/// it is scrubbed only after every inheritance consumer has run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListAttr {
    pub items: Attr<String>,
    pub additive: bool,
}

impl ListAttr {
    /// Store a raw directive value, consuming a leading `+` marker.
    pub fn set_raw(&mut self, raw: &str) {
        if raw == SENTINEL_NULL {
            self.items = Attr::Cleared;
            self.additive = false;
        } else if let Some(rest) = raw.strip_prefix('+') {
            self.items = Attr::Value(rest.trim_start().to_string());
            self.additive = true;
        } else {
            self.items = Attr::Value(raw.to_string());
        }
    }

    /// Append to the list (used by member directives that accumulate across
    /// repeated lines).
    pub fn append_raw(&mut self, raw: &str) {
        match &mut self.items {
            Attr::Value(existing) => {
                existing.push(',');
                existing.push_str(raw);
            }
            _ => self.set_raw(raw),
        }
    }

    /// Replace the list with an already-flattened value.
    pub fn set_flat(&mut self, joined: String) {
        self.items = Attr::Value(joined);
        self.additive = false;
    }

    pub fn is_unset(&self) -> bool {
        self.items.is_unset()
    }

    pub fn value(&self) -> Option<&str> {
        self.items.as_deref()
    }

    /// Iterate the comma-separated names, trimmed, empty entries skipped.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.value()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Template-inheritance merge: adopt the parent wholesale when unset, or
    /// prepend the parent's value when this list is additive.
    pub fn inherit_from(&mut self, parent: &ListAttr) {
        match (&self.items, &parent.items) {
            (Attr::Unset, Attr::Unset) => {}
            (Attr::Unset, _) => *self = parent.clone(),
            (Attr::Value(own), Attr::Value(theirs)) if self.additive => {
                self.items = Attr::Value(format!("{},{}", theirs, own));
                // Stay additive only if the parent still was: the chain may
                // continue against a runtime parent object.
                self.additive = parent.additive;
            }
            _ => {}
        }
    }
}

/// Custom variable (`_NAME value` directive). Names are stored uppercased
/// without the leading underscore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomVar {
    pub name: String,
    pub value: String,
}

impl CustomVar {
    pub fn from_directive(directive: &str, value: &str) -> Self {
        CustomVar {
            name: directive.trim_start_matches('_').to_uppercase(),
            value: value.to_string(),
        }
    }
}

/// Merge template custom variables into a record: variables the record
/// already defines win.
pub fn inherit_custom_vars(own: &mut Vec<CustomVar>, parent: &[CustomVar]) {
    for var in parent {
        if !own.iter().any(|v| v.name == var.name) {
            own.push(var.clone());
        }
    }
}

/// Bookkeeping shared by every record kind.
#[derive(Debug, Clone)]
pub struct RecordMeta {
    /// Template name (`name` directive); present on records meant to be
    /// inherited from.
    pub template_name: Option<String>,
    /// Comma list of parent template names (`use` directive).
    pub use_templates: Option<String>,
    /// Whether this record becomes a runtime entity (`register` directive;
    /// defaults on, templates usually turn it off).
    pub register: bool,
    pub resolved: bool,
    /// Cycle guard for depth-first template resolution.
    pub resolving: bool,
    /// Set on records produced by group fan-out; drives the second index
    /// pass so group-derived duplicates never displace direct definitions.
    pub from_group: bool,
    pub provenance: Provenance,
}

impl RecordMeta {
    pub fn new(provenance: Provenance) -> Self {
        RecordMeta {
            template_name: None,
            use_templates: None,
            register: true,
            resolved: false,
            resolving: false,
            from_group: false,
            provenance,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Timeperiod {
    pub meta: RecordMeta,
    pub timeperiod_name: Attr<String>,
    pub alias: Attr<String>,
    /// Raw time ranges, monday first.
    pub days: [Attr<String>; 7],
}

/// Weekday directive names, in `days` array order.
pub const DAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[derive(Debug, Clone)]
pub struct Command {
    pub meta: RecordMeta,
    pub command_name: Attr<String>,
    pub command_line: Attr<String>,
}

#[derive(Debug, Clone)]
pub struct Contact {
    pub meta: RecordMeta,
    pub contact_name: Attr<String>,
    pub alias: Attr<String>,
    pub email: Attr<String>,
    pub pager: Attr<String>,
    pub contactgroups: ListAttr,
    pub host_notification_period: Attr<String>,
    pub service_notification_period: Attr<String>,
    pub host_notification_options: Attr<HostNotifyOpts>,
    pub service_notification_options: Attr<ServiceNotifyOpts>,
    pub host_notification_commands: ListAttr,
    pub service_notification_commands: ListAttr,
    pub host_notifications_enabled: Attr<bool>,
    pub service_notifications_enabled: Attr<bool>,
    pub custom_vars: Vec<CustomVar>,
}

/// Hostgroups, servicegroups and contactgroups share one record shape: a
/// direct member list plus a subgroup list, both flattened in place.
#[derive(Debug, Clone)]
pub struct Group {
    pub meta: RecordMeta,
    pub group_name: Attr<String>,
    pub alias: Attr<String>,
    pub members: ListAttr,
    pub group_members: ListAttr,
}

#[derive(Debug, Clone)]
pub struct Host {
    pub meta: RecordMeta,
    pub host_name: Attr<String>,
    pub alias: Attr<String>,
    pub address: Attr<String>,
    pub parents: ListAttr,
    pub hostgroups: ListAttr,
    pub check_command: Attr<String>,
    pub check_period: Attr<String>,
    pub check_interval: Attr<u32>,
    pub retry_interval: Attr<u32>,
    pub max_check_attempts: Attr<u32>,
    pub active_checks_enabled: Attr<bool>,
    pub contact_groups: ListAttr,
    pub contacts: ListAttr,
    pub notification_period: Attr<String>,
    pub notification_interval: Attr<u32>,
    pub notification_options: Attr<HostNotifyOpts>,
    pub notifications_enabled: Attr<bool>,
    pub custom_vars: Vec<CustomVar>,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub meta: RecordMeta,
    pub host_name: ListAttr,
    pub hostgroup_name: ListAttr,
    pub service_description: Attr<String>,
    pub servicegroups: ListAttr,
    pub check_command: Attr<String>,
    pub check_period: Attr<String>,
    pub check_interval: Attr<u32>,
    pub retry_interval: Attr<u32>,
    pub max_check_attempts: Attr<u32>,
    pub is_volatile: Attr<bool>,
    pub active_checks_enabled: Attr<bool>,
    pub contact_groups: ListAttr,
    pub contacts: ListAttr,
    pub notification_period: Attr<String>,
    pub notification_interval: Attr<u32>,
    pub notification_options: Attr<ServiceNotifyOpts>,
    pub notifications_enabled: Attr<bool>,
    pub custom_vars: Vec<CustomVar>,
}

#[derive(Debug, Clone)]
pub struct HostDependency {
    pub meta: RecordMeta,
    pub dependent_host_name: ListAttr,
    pub dependent_hostgroup_name: ListAttr,
    pub host_name: ListAttr,
    pub hostgroup_name: ListAttr,
    pub inherits_parent: Attr<bool>,
    pub execution_failure_options: Attr<HostDependencyOpts>,
    pub notification_failure_options: Attr<HostDependencyOpts>,
    pub dependency_period: Attr<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceDependency {
    pub meta: RecordMeta,
    pub dependent_host_name: ListAttr,
    pub dependent_hostgroup_name: ListAttr,
    pub dependent_service_description: ListAttr,
    pub host_name: ListAttr,
    pub hostgroup_name: ListAttr,
    pub service_description: ListAttr,
    pub inherits_parent: Attr<bool>,
    pub execution_failure_options: Attr<ServiceDependencyOpts>,
    pub notification_failure_options: Attr<ServiceDependencyOpts>,
    pub dependency_period: Attr<String>,
}

#[derive(Debug, Clone)]
pub struct HostEscalation {
    pub meta: RecordMeta,
    pub host_name: ListAttr,
    pub hostgroup_name: ListAttr,
    pub first_notification: Attr<u32>,
    pub last_notification: Attr<u32>,
    pub notification_interval: Attr<u32>,
    pub escalation_period: Attr<String>,
    pub escalation_options: Attr<HostEscalationOpts>,
    pub contact_groups: ListAttr,
    pub contacts: ListAttr,
}

#[derive(Debug, Clone)]
pub struct ServiceEscalation {
    pub meta: RecordMeta,
    pub host_name: ListAttr,
    pub hostgroup_name: ListAttr,
    pub service_description: ListAttr,
    pub first_notification: Attr<u32>,
    pub last_notification: Attr<u32>,
    pub notification_interval: Attr<u32>,
    pub escalation_period: Attr<String>,
    pub escalation_options: Attr<ServiceEscalationOpts>,
    pub contact_groups: ListAttr,
    pub contacts: ListAttr,
}

#[derive(Debug, Clone)]
pub struct HostExtInfo {
    pub meta: RecordMeta,
    pub host_name: ListAttr,
    pub hostgroup_name: ListAttr,
    pub notes: Attr<String>,
    pub notes_url: Attr<String>,
    pub action_url: Attr<String>,
    pub icon_image: Attr<String>,
    pub icon_image_alt: Attr<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceExtInfo {
    pub meta: RecordMeta,
    pub host_name: ListAttr,
    pub hostgroup_name: ListAttr,
    pub service_description: Attr<String>,
    pub notes: Attr<String>,
    pub notes_url: Attr<String>,
    pub action_url: Attr<String>,
    pub icon_image: Attr<String>,
    pub icon_image_alt: Attr<String>,
}

macro_rules! new_with_meta {
    ($($record:ident { $($field:ident),* $(,)? })+) => {
        $(
            impl $record {
                pub fn new(provenance: Provenance) -> Self {
                    $record {
                        meta: RecordMeta::new(provenance),
                        $($field: Default::default(),)*
                    }
                }
            }
        )+
    };
}

new_with_meta! {
    Timeperiod { timeperiod_name, alias, days }
    Command { command_name, command_line }
    Contact {
        contact_name, alias, email, pager, contactgroups,
        host_notification_period, service_notification_period,
        host_notification_options, service_notification_options,
        host_notification_commands, service_notification_commands,
        host_notifications_enabled, service_notifications_enabled, custom_vars,
    }
    Group { group_name, alias, members, group_members }
    Host {
        host_name, alias, address, parents, hostgroups, check_command,
        check_period, check_interval, retry_interval, max_check_attempts,
        active_checks_enabled, contact_groups, contacts, notification_period,
        notification_interval, notification_options, notifications_enabled,
        custom_vars,
    }
    Service {
        host_name, hostgroup_name, service_description, servicegroups,
        check_command, check_period, check_interval, retry_interval,
        max_check_attempts, is_volatile, active_checks_enabled, contact_groups,
        contacts, notification_period, notification_interval,
        notification_options, notifications_enabled, custom_vars,
    }
    HostDependency {
        dependent_host_name, dependent_hostgroup_name, host_name,
        hostgroup_name, inherits_parent, execution_failure_options,
        notification_failure_options, dependency_period,
    }
    ServiceDependency {
        dependent_host_name, dependent_hostgroup_name,
        dependent_service_description, host_name, hostgroup_name,
        service_description, inherits_parent, execution_failure_options,
        notification_failure_options, dependency_period,
    }
    HostEscalation {
        host_name, hostgroup_name, first_notification, last_notification,
        notification_interval, escalation_period, escalation_options,
        contact_groups, contacts,
    }
    ServiceEscalation {
        host_name, hostgroup_name, service_description, first_notification,
        last_notification, notification_interval, escalation_period,
        escalation_options, contact_groups, contacts,
    }
    HostExtInfo {
        host_name, hostgroup_name, notes, notes_url, action_url, icon_image,
        icon_image_alt,
    }
    ServiceExtInfo {
        host_name, hostgroup_name, service_description, notes, notes_url,
        action_url, icon_image, icon_image_alt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prov() -> Provenance {
        Provenance { file: 0, line: 1 }
    }

    #[test]
    fn test_attr_tri_state() {
        let mut attr: Attr<String> = Attr::Unset;
        assert!(attr.is_unset());
        attr.set_raw("null");
        assert_eq!(attr, Attr::Cleared);
        attr.set_raw("ping");
        assert_eq!(attr.as_deref(), Some("ping"));
    }

    #[test]
    fn test_cleared_blocks_inheritance() {
        let parent = Attr::Value("from-parent".to_string());
        let mut cleared = Attr::Cleared;
        cleared.inherit_from(&parent);
        assert_eq!(cleared, Attr::<String>::Cleared);

        let mut unset = Attr::Unset;
        unset.inherit_from(&parent);
        assert_eq!(unset.as_deref(), Some("from-parent"));
    }

    #[test]
    fn test_cleared_state_itself_inherits() {
        // A template that explicitly cleared an attribute passes the
        // clearing down to children that never mention it.
        let parent: Attr<String> = Attr::Cleared;
        let mut child = Attr::Unset;
        child.inherit_from(&parent);
        assert_eq!(child, Attr::<String>::Cleared);
    }

    #[test]
    fn test_list_additive_marker() {
        let mut list = ListAttr::default();
        list.set_raw("+oncall,admins");
        assert!(list.additive);
        assert_eq!(list.value(), Some("oncall,admins"));

        let mut parent = ListAttr::default();
        parent.set_raw("ops");
        list.inherit_from(&parent);
        assert_eq!(list.value(), Some("ops,oncall,admins"));
        assert!(!list.additive);
    }

    #[test]
    fn test_list_additive_chain_survives_additive_parent() {
        let mut parent = ListAttr::default();
        parent.set_raw("+ops");
        let mut child = ListAttr::default();
        child.set_raw("+oncall");
        child.inherit_from(&parent);
        assert_eq!(child.value(), Some("ops,oncall"));
        // The parent never anchored the chain, so the child must stay
        // additive for the cross-object pass.
        assert!(child.additive);
    }

    #[test]
    fn test_list_replace_when_not_additive() {
        let mut parent = ListAttr::default();
        parent.set_raw("ops");
        let mut child = ListAttr::default();
        child.set_raw("oncall");
        child.inherit_from(&parent);
        assert_eq!(child.value(), Some("oncall"));
    }

    #[test]
    fn test_custom_var_normalization() {
        let var = CustomVar::from_directive("_http_port", "8080");
        assert_eq!(var.name, "HTTP_PORT");
        assert_eq!(var.value, "8080");
    }

    #[test]
    fn test_custom_var_inheritance_child_wins() {
        let mut own = vec![CustomVar {
            name: "PORT".into(),
            value: "443".into(),
        }];
        inherit_custom_vars(
            &mut own,
            &[
                CustomVar {
                    name: "PORT".into(),
                    value: "80".into(),
                },
                CustomVar {
                    name: "RACK".into(),
                    value: "r1".into(),
                },
            ],
        );
        assert_eq!(own.len(), 2);
        assert_eq!(own[0].value, "443");
        assert_eq!(own[1].name, "RACK");
    }

    #[test]
    fn test_kind_keyword_round_trip() {
        for kind in [
            ObjectKind::Timeperiod,
            ObjectKind::Command,
            ObjectKind::Contact,
            ObjectKind::Contactgroup,
            ObjectKind::Host,
            ObjectKind::Hostgroup,
            ObjectKind::Service,
            ObjectKind::Servicegroup,
            ObjectKind::ServiceDependency,
            ObjectKind::ServiceEscalation,
            ObjectKind::HostDependency,
            ObjectKind::HostEscalation,
            ObjectKind::HostExtInfo,
            ObjectKind::ServiceExtInfo,
        ] {
            assert_eq!(ObjectKind::from_keyword(kind.as_str()), Some(kind));
        }
        assert_eq!(ObjectKind::from_keyword("widget"), None);
    }

    #[test]
    fn test_new_record_defaults() {
        let host = Host::new(prov());
        assert!(host.meta.register);
        assert!(!host.meta.resolved);
        assert!(host.host_name.is_unset());
        assert!(host.custom_vars.is_empty());
    }
}
