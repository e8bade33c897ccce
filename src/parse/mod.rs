//! Ingestion and directive dispatch
//!
//! Turns logical config lines into typed records. A two-state machine walks
//! each file: outside a definition only `define <kind> {` is legal; inside,
//! every line is a `directive value` pair dispatched through the kind's
//! setter table until the closing `}`. Records land in the session arenas,
//! and identity directives insert into the name indexes as soon as the full
//! key is known. Kinds not requested by the session's kind mask are skipped
//! but still consume their block.

use std::path::Path;

use log::warn;

use crate::errors::LoadError;
use crate::reader::{self, LogicalLine};
use crate::records::{
    Attr, Command, Contact, CustomVar, Group, Host, HostDependency, HostDependencyOpts,
    HostEscalation, HostEscalationOpts, HostExtInfo, HostNotifyOpts, ObjectKind, Provenance,
    Service, ServiceDependency, ServiceDependencyOpts, ServiceEscalation, ServiceEscalationOpts,
    ServiceExtInfo, ServiceNotifyOpts, Timeperiod, DAY_NAMES, SENTINEL_NULL,
};
use crate::session::LoadSession;

/// Parser state: outside a definition, inside a kept record, or consuming a
/// block whose kind was not requested.
enum Current {
    None,
    Keep(ObjectKind, usize),
    Skip,
}

pub(crate) fn process_object_file(session: &mut LoadSession, path: &Path) -> Result<(), LoadError> {
    let file_id = session.add_file(path);
    let lines = reader::read_logical_lines(path)?;
    process_lines(session, file_id, &lines)
}

/// Ingest object text under a virtual file name.
pub(crate) fn process_object_text(
    session: &mut LoadSession,
    name: &str,
    text: &str,
) -> Result<(), LoadError> {
    let file_id = session.add_file(Path::new(name));
    let lines = reader::logical_lines(text);
    process_lines(session, file_id, &lines)
}

fn process_lines(
    session: &mut LoadSession,
    file_id: usize,
    lines: &[LogicalLine],
) -> Result<(), LoadError> {
    let mut current = Current::None;
    let mut last_line = 0u32;

    for entry in lines {
        let prov = Provenance {
            file: file_id,
            line: entry.line,
        };
        last_line = entry.line;
        let text = entry.text.as_str();
        let (first, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));

        if first == "define" {
            if !matches!(current, Current::None) {
                return Err(session.parse_error(
                    prov,
                    "unexpected start of object definition - close the preceding object first",
                ));
            }
            let kind = parse_define(session, rest, prov)?;
            current = begin_definition(session, kind, prov);
        } else if text == "}" {
            match current {
                Current::None => {
                    return Err(session.parse_error(prov, "unexpected closing brace"));
                }
                Current::Keep(kind, id) => end_definition(session, kind, id, prov)?,
                Current::Skip => {}
            }
            current = Current::None;
        } else {
            match current {
                Current::None => {
                    return Err(
                        session.parse_error(prov, "unexpected token outside of object definition")
                    );
                }
                Current::Skip => {}
                Current::Keep(kind, id) => apply_directive(session, kind, id, text, prov)?,
            }
        }
    }

    if !matches!(current, Current::None) {
        return Err(session.parse_error(
            Provenance {
                file: file_id,
                line: last_line,
            },
            "unexpected EOF in object definition - missing closing brace",
        ));
    }
    Ok(())
}

/// Validate the `<kind> {` part of a define line.
fn parse_define(
    session: &LoadSession,
    rest: &str,
    prov: Provenance,
) -> Result<ObjectKind, LoadError> {
    let rest = rest.trim();
    let Some(brace) = rest.find('{') else {
        return Err(session.parse_error(prov, "expected '{' in object definition"));
    };
    let kind_word = rest[..brace].trim();
    if kind_word.is_empty() {
        return Err(session.parse_error(prov, "no object type specified"));
    }
    ObjectKind::from_keyword(kind_word).ok_or_else(|| {
        session.parse_error(prov, format!("invalid object definition type '{}'", kind_word))
    })
}

fn begin_definition(session: &mut LoadSession, kind: ObjectKind, prov: Provenance) -> Current {
    if !session.options.kinds.contains(kind.mask()) {
        return Current::Skip;
    }
    let id = match kind {
        ObjectKind::Timeperiod => {
            session.timeperiods.push(Timeperiod::new(prov));
            session.timeperiods.len() - 1
        }
        ObjectKind::Command => {
            session.commands.push(Command::new(prov));
            session.commands.len() - 1
        }
        ObjectKind::Contact => {
            session.contacts.push(Contact::new(prov));
            session.contacts.len() - 1
        }
        ObjectKind::Contactgroup => {
            session.contactgroups.push(Group::new(prov));
            session.contactgroups.len() - 1
        }
        ObjectKind::Host => {
            session.hosts.push(Host::new(prov));
            session.hosts.len() - 1
        }
        ObjectKind::Hostgroup => {
            session.hostgroups.push(Group::new(prov));
            session.hostgroups.len() - 1
        }
        ObjectKind::Service => {
            session.services.push(Service::new(prov));
            session.services.len() - 1
        }
        ObjectKind::Servicegroup => {
            session.servicegroups.push(Group::new(prov));
            session.servicegroups.len() - 1
        }
        ObjectKind::ServiceDependency => {
            session.servicedependencies.push(ServiceDependency::new(prov));
            session.servicedependencies.len() - 1
        }
        ObjectKind::ServiceEscalation => {
            session.serviceescalations.push(ServiceEscalation::new(prov));
            session.serviceescalations.len() - 1
        }
        ObjectKind::HostDependency => {
            session.hostdependencies.push(HostDependency::new(prov));
            session.hostdependencies.len() - 1
        }
        ObjectKind::HostEscalation => {
            session.hostescalations.push(HostEscalation::new(prov));
            session.hostescalations.len() - 1
        }
        ObjectKind::HostExtInfo => {
            session.hostextinfo.push(HostExtInfo::new(prov));
            session.hostextinfo.len() - 1
        }
        ObjectKind::ServiceExtInfo => {
            session.serviceextinfo.push(ServiceExtInfo::new(prov));
            session.serviceextinfo.len() - 1
        }
    };
    Current::Keep(kind, id)
}

/// Close a record. With pre-flattened input the link kinds (dependencies,
/// escalations, extended-info) index here, since duplication - which
/// normally builds their indexes - is skipped.
fn end_definition(
    session: &mut LoadSession,
    kind: ObjectKind,
    id: usize,
    prov: Provenance,
) -> Result<(), LoadError> {
    if !session.options.precached {
        return Ok(());
    }
    match kind {
        ObjectKind::HostDependency => {
            let key = required(session, prov, session.hostdependencies[id].dependent_host_name.value(), "dependent_host_name")?;
            session.hostdependency_index.insert(key, id);
        }
        ObjectKind::ServiceDependency => {
            let dep = &session.servicedependencies[id];
            let host = required(session, prov, dep.dependent_host_name.value(), "dependent_host_name")?;
            let desc = required(session, prov, dep.dependent_service_description.value(), "dependent_service_description")?;
            session.servicedependency_index.insert((host, desc), id);
        }
        ObjectKind::HostEscalation => {
            let key = required(session, prov, session.hostescalations[id].host_name.value(), "host_name")?;
            session.hostescalation_index.insert(key, id);
        }
        ObjectKind::ServiceEscalation => {
            let esc = &session.serviceescalations[id];
            let host = required(session, prov, esc.host_name.value(), "host_name")?;
            let desc = required(session, prov, esc.service_description.value(), "service_description")?;
            session.serviceescalation_index.insert((host, desc), id);
        }
        ObjectKind::HostExtInfo => {
            let key = required(session, prov, session.hostextinfo[id].host_name.value(), "host_name")?;
            if !session.hostextinfo_index.insert(key.clone(), id) {
                return Err(duplicate(session, ObjectKind::HostExtInfo, key, prov));
            }
        }
        ObjectKind::ServiceExtInfo => {
            let info = &session.serviceextinfo[id];
            let host = required(session, prov, info.host_name.value(), "host_name")?;
            let desc = required(session, prov, info.service_description.as_deref(), "service_description")?;
            let key = (host, desc);
            if !session.serviceextinfo_index.insert(key.clone(), id) {
                return Err(duplicate(session, ObjectKind::ServiceExtInfo, format!("{};{}", key.0, key.1), prov));
            }
        }
        _ => {}
    }
    Ok(())
}

fn required(
    session: &LoadSession,
    prov: Provenance,
    value: Option<&str>,
    what: &str,
) -> Result<String, LoadError> {
    value
        .map(str::to_string)
        .ok_or_else(|| session.parse_error(prov, format!("definition is missing '{}'", what)))
}

fn duplicate(session: &LoadSession, kind: ObjectKind, key: String, prov: Provenance) -> LoadError {
    LoadError::DuplicateDefinition {
        kind,
        key,
        file: session.file_name(prov.file),
        line: prov.line,
    }
}

fn split_directive(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((d, v)) => (d.trim(), v.trim()),
        None => (text.trim(), ""),
    }
}

fn meta_mut(session: &mut LoadSession, kind: ObjectKind, id: usize) -> &mut crate::records::RecordMeta {
    match kind {
        ObjectKind::Timeperiod => &mut session.timeperiods[id].meta,
        ObjectKind::Command => &mut session.commands[id].meta,
        ObjectKind::Contact => &mut session.contacts[id].meta,
        ObjectKind::Contactgroup => &mut session.contactgroups[id].meta,
        ObjectKind::Host => &mut session.hosts[id].meta,
        ObjectKind::Hostgroup => &mut session.hostgroups[id].meta,
        ObjectKind::Service => &mut session.services[id].meta,
        ObjectKind::Servicegroup => &mut session.servicegroups[id].meta,
        ObjectKind::ServiceDependency => &mut session.servicedependencies[id].meta,
        ObjectKind::ServiceEscalation => &mut session.serviceescalations[id].meta,
        ObjectKind::HostDependency => &mut session.hostdependencies[id].meta,
        ObjectKind::HostEscalation => &mut session.hostescalations[id].meta,
        ObjectKind::HostExtInfo => &mut session.hostextinfo[id].meta,
        ObjectKind::ServiceExtInfo => &mut session.serviceextinfo[id].meta,
    }
}

fn bool_value(value: &str) -> Result<bool, String> {
    value
        .parse::<i64>()
        .map(|n| n != 0)
        .map_err(|_| format!("expected 0 or 1, got '{}'", value))
}

fn set_u32(attr: &mut Attr<u32>, value: &str) -> Result<(), String> {
    if value == SENTINEL_NULL {
        *attr = Attr::Cleared;
        return Ok(());
    }
    let parsed = value
        .parse::<u32>()
        .map_err(|_| format!("invalid number '{}'", value))?;
    *attr = Attr::Value(parsed);
    Ok(())
}

fn set_bool(attr: &mut Attr<bool>, value: &str) -> Result<(), String> {
    if value == SENTINEL_NULL {
        *attr = Attr::Cleared;
        return Ok(());
    }
    *attr = Attr::Value(bool_value(value)?);
    Ok(())
}

/// Set an option-set attribute, honoring the `null` sentinel.
macro_rules! set_opts {
    ($attr:expr, $ty:ty, $value:expr) => {{
        if $value == SENTINEL_NULL {
            $attr = Attr::Cleared;
            Ok(())
        } else {
            match <$ty>::parse($value) {
                Ok(v) => {
                    $attr = Attr::Value(v);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
    }};
}

fn apply_directive(
    session: &mut LoadSession,
    kind: ObjectKind,
    id: usize,
    text: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    let (directive, value) = split_directive(text);
    if value.is_empty() {
        return Err(session.parse_error(prov, format!("no value for directive '{}'", directive)));
    }

    // Directives every kind understands.
    match directive {
        "use" => {
            meta_mut(session, kind, id).use_templates = Some(value.to_string());
            return Ok(());
        }
        "name" => {
            meta_mut(session, kind, id).template_name = Some(value.to_string());
            if !session.template_index[kind.ordinal()].insert(value.to_string(), id) {
                warn!(
                    "duplicate {} template '{}' ({}:{})",
                    kind,
                    value,
                    session.file_name(prov.file),
                    prov.line
                );
            }
            return Ok(());
        }
        "register" => {
            let flag = bool_value(value).map_err(|e| session.parse_error(prov, e))?;
            meta_mut(session, kind, id).register = flag;
            return Ok(());
        }
        _ => {}
    }

    match kind {
        ObjectKind::Timeperiod => timeperiod_directive(session, id, directive, value, prov),
        ObjectKind::Command => command_directive(session, id, directive, value, prov),
        ObjectKind::Contact => contact_directive(session, id, directive, value, prov),
        ObjectKind::Host => host_directive(session, id, directive, value, prov),
        ObjectKind::Service => service_directive(session, id, directive, value, prov),
        ObjectKind::Contactgroup | ObjectKind::Hostgroup | ObjectKind::Servicegroup => {
            group_directive(session, kind, id, directive, value, prov)
        }
        ObjectKind::ServiceDependency => {
            servicedependency_directive(session, id, directive, value, prov)
        }
        ObjectKind::ServiceEscalation => {
            serviceescalation_directive(session, id, directive, value, prov)
        }
        ObjectKind::HostDependency => hostdependency_directive(session, id, directive, value, prov),
        ObjectKind::HostEscalation => hostescalation_directive(session, id, directive, value, prov),
        ObjectKind::HostExtInfo => hostextinfo_directive(session, id, directive, value, prov),
        ObjectKind::ServiceExtInfo => serviceextinfo_directive(session, id, directive, value, prov),
    }
}

fn unknown(
    session: &LoadSession,
    kind: ObjectKind,
    directive: &str,
    prov: Provenance,
) -> LoadError {
    session.parse_error(prov, format!("invalid {} directive '{}'", kind, directive))
}

fn timeperiod_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    match directive {
        "timeperiod_name" => {
            session.timeperiods[id].timeperiod_name.set_raw(value);
            if !session.timeperiod_index.insert(value.to_string(), id) {
                return Err(duplicate(session, ObjectKind::Timeperiod, value.to_string(), prov));
            }
        }
        "alias" => session.timeperiods[id].alias.set_raw(value),
        day if DAY_NAMES.contains(&day) => {
            let slot = DAY_NAMES.iter().position(|d| *d == day).unwrap_or(0);
            session.timeperiods[id].days[slot].set_raw(value);
        }
        _ => return Err(unknown(session, ObjectKind::Timeperiod, directive, prov)),
    }
    Ok(())
}

fn command_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    match directive {
        "command_name" => {
            session.commands[id].command_name.set_raw(value);
            if !session.command_index.insert(value.to_string(), id) {
                return Err(duplicate(session, ObjectKind::Command, value.to_string(), prov));
            }
        }
        "command_line" => session.commands[id].command_line.set_raw(value),
        _ => return Err(unknown(session, ObjectKind::Command, directive, prov)),
    }
    Ok(())
}

fn contact_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    if directive.starts_with('_') {
        let var = CustomVar::from_directive(directive, value);
        session.contacts[id].custom_vars.push(var);
        return Ok(());
    }
    let map_err = |session: &LoadSession, e: String| session.parse_error(prov, e);
    match directive {
        "contact_name" => {
            session.contacts[id].contact_name.set_raw(value);
            if !session.contact_index.insert(value.to_string(), id) {
                return Err(duplicate(session, ObjectKind::Contact, value.to_string(), prov));
            }
        }
        "alias" => session.contacts[id].alias.set_raw(value),
        "email" => session.contacts[id].email.set_raw(value),
        "pager" => session.contacts[id].pager.set_raw(value),
        "contactgroups" => session.contacts[id].contactgroups.set_raw(value),
        "host_notification_period" => session.contacts[id].host_notification_period.set_raw(value),
        "service_notification_period" => {
            session.contacts[id].service_notification_period.set_raw(value)
        }
        "host_notification_options" => {
            set_opts!(session.contacts[id].host_notification_options, HostNotifyOpts, value)
                .map_err(|e| map_err(session, e))?
        }
        "service_notification_options" => {
            set_opts!(session.contacts[id].service_notification_options, ServiceNotifyOpts, value)
                .map_err(|e| map_err(session, e))?
        }
        "host_notification_commands" => {
            session.contacts[id].host_notification_commands.set_raw(value)
        }
        "service_notification_commands" => {
            session.contacts[id].service_notification_commands.set_raw(value)
        }
        "host_notifications_enabled" => {
            set_bool(&mut session.contacts[id].host_notifications_enabled, value)
                .map_err(|e| map_err(session, e))?
        }
        "service_notifications_enabled" => {
            set_bool(&mut session.contacts[id].service_notifications_enabled, value)
                .map_err(|e| map_err(session, e))?
        }
        _ => return Err(unknown(session, ObjectKind::Contact, directive, prov)),
    }
    Ok(())
}

fn host_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    if directive.starts_with('_') {
        let var = CustomVar::from_directive(directive, value);
        session.hosts[id].custom_vars.push(var);
        return Ok(());
    }
    let map_err = |session: &LoadSession, e: String| session.parse_error(prov, e);
    match directive {
        "host_name" => {
            session.hosts[id].host_name.set_raw(value);
            if !session.host_index.insert(value.to_string(), id) {
                return Err(duplicate(session, ObjectKind::Host, value.to_string(), prov));
            }
        }
        "alias" => session.hosts[id].alias.set_raw(value),
        "address" => session.hosts[id].address.set_raw(value),
        "parents" => session.hosts[id].parents.set_raw(value),
        "hostgroups" => session.hosts[id].hostgroups.set_raw(value),
        "check_command" => session.hosts[id].check_command.set_raw(value),
        "check_period" => session.hosts[id].check_period.set_raw(value),
        "check_interval" | "normal_check_interval" => {
            set_u32(&mut session.hosts[id].check_interval, value)
                .map_err(|e| map_err(session, e))?
        }
        "retry_interval" | "retry_check_interval" => {
            set_u32(&mut session.hosts[id].retry_interval, value)
                .map_err(|e| map_err(session, e))?
        }
        "max_check_attempts" => {
            set_u32(&mut session.hosts[id].max_check_attempts, value)
                .map_err(|e| map_err(session, e))?
        }
        "active_checks_enabled" => {
            set_bool(&mut session.hosts[id].active_checks_enabled, value)
                .map_err(|e| map_err(session, e))?
        }
        "contact_groups" => session.hosts[id].contact_groups.set_raw(value),
        "contacts" => session.hosts[id].contacts.set_raw(value),
        "notification_period" => session.hosts[id].notification_period.set_raw(value),
        "notification_interval" => {
            set_u32(&mut session.hosts[id].notification_interval, value)
                .map_err(|e| map_err(session, e))?
        }
        "notification_options" => {
            set_opts!(session.hosts[id].notification_options, HostNotifyOpts, value)
                .map_err(|e| map_err(session, e))?
        }
        "notifications_enabled" => {
            set_bool(&mut session.hosts[id].notifications_enabled, value)
                .map_err(|e| map_err(session, e))?
        }
        _ => return Err(unknown(session, ObjectKind::Host, directive, prov)),
    }
    Ok(())
}

fn service_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    if directive.starts_with('_') {
        let var = CustomVar::from_directive(directive, value);
        session.services[id].custom_vars.push(var);
        return Ok(());
    }
    let map_err = |session: &LoadSession, e: String| session.parse_error(prov, e);
    match directive {
        "host_name" => {
            session.services[id].host_name.set_raw(value);
            try_index_service(session, id, prov);
        }
        "hostgroup_name" => session.services[id].hostgroup_name.set_raw(value),
        "service_description" => {
            session.services[id].service_description.set_raw(value);
            try_index_service(session, id, prov);
        }
        "servicegroups" => session.services[id].servicegroups.set_raw(value),
        "check_command" => session.services[id].check_command.set_raw(value),
        "check_period" => session.services[id].check_period.set_raw(value),
        "check_interval" | "normal_check_interval" => {
            set_u32(&mut session.services[id].check_interval, value)
                .map_err(|e| map_err(session, e))?
        }
        "retry_interval" | "retry_check_interval" => {
            set_u32(&mut session.services[id].retry_interval, value)
                .map_err(|e| map_err(session, e))?
        }
        "max_check_attempts" => {
            set_u32(&mut session.services[id].max_check_attempts, value)
                .map_err(|e| map_err(session, e))?
        }
        "is_volatile" => set_bool(&mut session.services[id].is_volatile, value)
            .map_err(|e| map_err(session, e))?,
        "active_checks_enabled" => {
            set_bool(&mut session.services[id].active_checks_enabled, value)
                .map_err(|e| map_err(session, e))?
        }
        "contact_groups" => session.services[id].contact_groups.set_raw(value),
        "contacts" => session.services[id].contacts.set_raw(value),
        "notification_period" => session.services[id].notification_period.set_raw(value),
        "notification_interval" => {
            set_u32(&mut session.services[id].notification_interval, value)
                .map_err(|e| map_err(session, e))?
        }
        "notification_options" => {
            set_opts!(session.services[id].notification_options, ServiceNotifyOpts, value)
                .map_err(|e| map_err(session, e))?
        }
        "notifications_enabled" => {
            set_bool(&mut session.services[id].notifications_enabled, value)
                .map_err(|e| map_err(session, e))?
        }
        _ => return Err(unknown(session, ObjectKind::Service, directive, prov)),
    }
    Ok(())
}

/// Insert a service into the pair-keyed index once both key parts are known.
/// Pre-duplication keys may still contain raw lists or group references;
/// the index is rebuilt with concrete keys after fan-out, so a clash here is
/// only an early warning about identical definitions.
fn try_index_service(session: &mut LoadSession, id: usize, prov: Provenance) {
    let svc = &session.services[id];
    let (Some(host), Some(desc)) = (svc.host_name.value(), svc.service_description.as_deref())
    else {
        return;
    };
    let key = (host.to_string(), desc.to_string());
    if !session.service_index.insert(key, id) {
        let svc = &session.services[id];
        warn!(
            "duplicate service definition '{};{}' ({}:{})",
            svc.host_name.value().unwrap_or(""),
            svc.service_description.as_deref().unwrap_or(""),
            session.file_name(prov.file),
            prov.line
        );
    }
}

fn group_directive(
    session: &mut LoadSession,
    kind: ObjectKind,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    let (name_directive, members_directive) = match kind {
        ObjectKind::Contactgroup => ("contactgroup_name", "contactgroup_members"),
        ObjectKind::Hostgroup => ("hostgroup_name", "hostgroup_members"),
        _ => ("servicegroup_name", "servicegroup_members"),
    };

    let group = match kind {
        ObjectKind::Contactgroup => &mut session.contactgroups[id],
        ObjectKind::Hostgroup => &mut session.hostgroups[id],
        _ => &mut session.servicegroups[id],
    };

    if directive == name_directive {
        group.group_name.set_raw(value);
        let index = match kind {
            ObjectKind::Contactgroup => &mut session.contactgroup_index,
            ObjectKind::Hostgroup => &mut session.hostgroup_index,
            _ => &mut session.servicegroup_index,
        };
        if !index.insert(value.to_string(), id) {
            return Err(duplicate(session, kind, value.to_string(), prov));
        }
    } else if directive == "alias" {
        group.alias.set_raw(value);
    } else if directive == "members" {
        group.members.append_raw(value);
    } else if directive == members_directive {
        group.group_members.append_raw(value);
    } else {
        return Err(unknown(session, kind, directive, prov));
    }
    Ok(())
}

fn hostdependency_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    let map_err = |session: &LoadSession, e: String| session.parse_error(prov, e);
    let dep = &mut session.hostdependencies[id];
    match directive {
        "dependent_host_name" => dep.dependent_host_name.set_raw(value),
        "dependent_hostgroup_name" => dep.dependent_hostgroup_name.set_raw(value),
        "host_name" | "master_host_name" => dep.host_name.set_raw(value),
        "hostgroup_name" | "master_hostgroup_name" => dep.hostgroup_name.set_raw(value),
        "inherits_parent" => {
            set_bool(&mut dep.inherits_parent, value).map_err(|e| map_err(session, e))?
        }
        "execution_failure_options" | "execution_failure_criteria" => {
            set_opts!(session.hostdependencies[id].execution_failure_options, HostDependencyOpts, value)
                .map_err(|e| map_err(session, e))?
        }
        "notification_failure_options" | "notification_failure_criteria" => {
            set_opts!(session.hostdependencies[id].notification_failure_options, HostDependencyOpts, value)
                .map_err(|e| map_err(session, e))?
        }
        "dependency_period" => session.hostdependencies[id].dependency_period.set_raw(value),
        _ => return Err(unknown(session, ObjectKind::HostDependency, directive, prov)),
    }
    Ok(())
}

fn servicedependency_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    let map_err = |session: &LoadSession, e: String| session.parse_error(prov, e);
    let dep = &mut session.servicedependencies[id];
    match directive {
        "dependent_host_name" => dep.dependent_host_name.set_raw(value),
        "dependent_hostgroup_name" => dep.dependent_hostgroup_name.set_raw(value),
        "dependent_service_description" => dep.dependent_service_description.set_raw(value),
        "host_name" | "master_host_name" => dep.host_name.set_raw(value),
        "hostgroup_name" | "master_hostgroup_name" => dep.hostgroup_name.set_raw(value),
        "service_description" | "master_service_description" => {
            dep.service_description.set_raw(value)
        }
        "inherits_parent" => {
            set_bool(&mut dep.inherits_parent, value).map_err(|e| map_err(session, e))?
        }
        "execution_failure_options" | "execution_failure_criteria" => {
            set_opts!(session.servicedependencies[id].execution_failure_options, ServiceDependencyOpts, value)
                .map_err(|e| map_err(session, e))?
        }
        "notification_failure_options" | "notification_failure_criteria" => {
            set_opts!(session.servicedependencies[id].notification_failure_options, ServiceDependencyOpts, value)
                .map_err(|e| map_err(session, e))?
        }
        "dependency_period" => session.servicedependencies[id].dependency_period.set_raw(value),
        _ => return Err(unknown(session, ObjectKind::ServiceDependency, directive, prov)),
    }
    Ok(())
}

fn hostescalation_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    let map_err = |session: &LoadSession, e: String| session.parse_error(prov, e);
    let esc = &mut session.hostescalations[id];
    match directive {
        "host_name" => esc.host_name.set_raw(value),
        "hostgroup_name" => esc.hostgroup_name.set_raw(value),
        "first_notification" => {
            set_u32(&mut esc.first_notification, value).map_err(|e| map_err(session, e))?
        }
        "last_notification" => {
            set_u32(&mut esc.last_notification, value).map_err(|e| map_err(session, e))?
        }
        "notification_interval" => {
            set_u32(&mut esc.notification_interval, value).map_err(|e| map_err(session, e))?
        }
        "escalation_period" => session.hostescalations[id].escalation_period.set_raw(value),
        "escalation_options" => {
            set_opts!(session.hostescalations[id].escalation_options, HostEscalationOpts, value)
                .map_err(|e| map_err(session, e))?
        }
        "contact_groups" => session.hostescalations[id].contact_groups.set_raw(value),
        "contacts" => session.hostescalations[id].contacts.set_raw(value),
        _ => return Err(unknown(session, ObjectKind::HostEscalation, directive, prov)),
    }
    Ok(())
}

fn serviceescalation_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    let map_err = |session: &LoadSession, e: String| session.parse_error(prov, e);
    let esc = &mut session.serviceescalations[id];
    match directive {
        "host_name" => esc.host_name.set_raw(value),
        "hostgroup_name" => esc.hostgroup_name.set_raw(value),
        "service_description" => esc.service_description.set_raw(value),
        "first_notification" => {
            set_u32(&mut esc.first_notification, value).map_err(|e| map_err(session, e))?
        }
        "last_notification" => {
            set_u32(&mut esc.last_notification, value).map_err(|e| map_err(session, e))?
        }
        "notification_interval" => {
            set_u32(&mut esc.notification_interval, value).map_err(|e| map_err(session, e))?
        }
        "escalation_period" => session.serviceescalations[id].escalation_period.set_raw(value),
        "escalation_options" => {
            set_opts!(session.serviceescalations[id].escalation_options, ServiceEscalationOpts, value)
                .map_err(|e| map_err(session, e))?
        }
        "contact_groups" => session.serviceescalations[id].contact_groups.set_raw(value),
        "contacts" => session.serviceescalations[id].contacts.set_raw(value),
        _ => return Err(unknown(session, ObjectKind::ServiceEscalation, directive, prov)),
    }
    Ok(())
}

fn hostextinfo_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    let info = &mut session.hostextinfo[id];
    match directive {
        "host_name" => info.host_name.set_raw(value),
        "hostgroup_name" => info.hostgroup_name.set_raw(value),
        "notes" => info.notes.set_raw(value),
        "notes_url" => info.notes_url.set_raw(value),
        "action_url" => info.action_url.set_raw(value),
        "icon_image" => info.icon_image.set_raw(value),
        "icon_image_alt" => info.icon_image_alt.set_raw(value),
        _ => return Err(unknown(session, ObjectKind::HostExtInfo, directive, prov)),
    }
    Ok(())
}

fn serviceextinfo_directive(
    session: &mut LoadSession,
    id: usize,
    directive: &str,
    value: &str,
    prov: Provenance,
) -> Result<(), LoadError> {
    let info = &mut session.serviceextinfo[id];
    match directive {
        "host_name" => info.host_name.set_raw(value),
        "hostgroup_name" => info.hostgroup_name.set_raw(value),
        "service_description" => info.service_description.set_raw(value),
        "notes" => info.notes.set_raw(value),
        "notes_url" => info.notes_url.set_raw(value),
        "action_url" => info.action_url.set_raw(value),
        "icon_image" => info.icon_image.set_raw(value),
        "icon_image_alt" => info.icon_image_alt.set_raw(value),
        _ => return Err(unknown(session, ObjectKind::ServiceExtInfo, directive, prov)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::KindMask;
    use crate::session::{LoadOptions, LoadSession};

    fn session() -> LoadSession {
        LoadSession::new(LoadOptions {
            index_seed: Some(1),
            ..LoadOptions::default()
        })
    }

    fn ingest(session: &mut LoadSession, text: &str) -> Result<(), LoadError> {
        process_object_text(session, "test.cfg", text)
    }

    #[test]
    fn test_basic_host_definition() {
        let mut s = session();
        ingest(
            &mut s,
            "define host {\n\
             \thost_name web01\n\
             \talias Web Server\n\
             \taddress 10.0.0.1\n\
             \tcheck_interval 5\n\
             \tnotification_options d,r\n\
             \t_RACK b12\n\
             }\n",
        )
        .unwrap();
        assert_eq!(s.hosts.len(), 1);
        let host = &s.hosts[0];
        assert_eq!(host.host_name.as_deref(), Some("web01"));
        assert_eq!(host.alias.as_deref(), Some("Web Server"));
        assert_eq!(host.check_interval.value(), Some(&5));
        assert_eq!(
            host.notification_options.value(),
            Some(&(HostNotifyOpts::DOWN | HostNotifyOpts::RECOVERY))
        );
        assert_eq!(host.custom_vars[0].name, "RACK");
        assert_eq!(host.custom_vars[0].value, "b12");
        assert_eq!(s.host_index.find_first(&"web01".to_string()), Some(&0));
    }

    #[test]
    fn test_template_goes_to_template_index() {
        let mut s = session();
        ingest(
            &mut s,
            "define host {\n\tname generic-host\n\tcheck_interval 5\n\tregister 0\n}\n",
        )
        .unwrap();
        assert!(!s.hosts[0].meta.register);
        let idx = &s.template_index[ObjectKind::Host.ordinal()];
        assert_eq!(idx.find_first(&"generic-host".to_string()), Some(&0));
        assert!(s.host_index.is_empty());
    }

    #[test]
    fn test_unknown_directive_is_fatal() {
        let mut s = session();
        let err = ingest(&mut s, "define host {\n\thost_name a\n\tbogus 1\n}\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_unknown_kind_is_fatal() {
        let mut s = session();
        let err = ingest(&mut s, "define widget {\n}\n").unwrap_err();
        assert!(err.to_string().contains("invalid object definition type"));
    }

    #[test]
    fn test_nested_define_is_fatal() {
        let mut s = session();
        let err = ingest(&mut s, "define host {\ndefine host {\n}\n}\n").unwrap_err();
        assert!(err.to_string().contains("unexpected start"));
    }

    #[test]
    fn test_eof_inside_definition_is_fatal() {
        let mut s = session();
        let err = ingest(&mut s, "define host {\n\thost_name a\n").unwrap_err();
        assert!(err.to_string().contains("unexpected EOF"));
    }

    #[test]
    fn test_stray_close_brace_is_fatal() {
        let mut s = session();
        let err = ingest(&mut s, "}\n").unwrap_err();
        assert!(err.to_string().contains("unexpected closing brace"));
    }

    #[test]
    fn test_duplicate_host_name_is_fatal() {
        let mut s = session();
        let err = ingest(
            &mut s,
            "define host {\n\thost_name a\n}\ndefine host {\n\thost_name a\n}\n",
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateDefinition { .. }));
    }

    #[test]
    fn test_unselected_kind_consumes_block() {
        let mut s = LoadSession::new(LoadOptions {
            kinds: KindMask::HOSTS,
            index_seed: Some(1),
            ..LoadOptions::default()
        });
        ingest(
            &mut s,
            "define command {\n\tcommand_name ping\n\tcommand_line /bin/ping $ARG1$\n}\n\
             define host {\n\thost_name a\n}\n",
        )
        .unwrap();
        assert!(s.commands.is_empty());
        assert_eq!(s.hosts.len(), 1);
    }

    #[test]
    fn test_null_sentinel_clears_attribute() {
        let mut s = session();
        ingest(
            &mut s,
            "define host {\n\thost_name a\n\tcontact_groups null\n\tcheck_interval null\n}\n",
        )
        .unwrap();
        let host = &s.hosts[0];
        assert_eq!(host.contact_groups.items, Attr::Cleared);
        assert_eq!(host.check_interval, Attr::Cleared);
    }

    #[test]
    fn test_service_indexed_when_both_key_parts_known() {
        let mut s = session();
        ingest(
            &mut s,
            "define service {\n\thost_name web01\n\tservice_description ssh\n\tcheck_command check_ssh\n}\n",
        )
        .unwrap();
        let key = ("web01".to_string(), "ssh".to_string());
        assert_eq!(s.service_index.find_first(&key), Some(&0));
    }

    #[test]
    fn test_group_members_accumulate() {
        let mut s = session();
        ingest(
            &mut s,
            "define hostgroup {\n\thostgroup_name web\n\tmembers a,b\n\tmembers c\n}\n",
        )
        .unwrap();
        assert_eq!(s.hostgroups[0].members.value(), Some("a,b,c"));
    }

    #[test]
    fn test_additive_marker_sets_flag() {
        let mut s = session();
        ingest(
            &mut s,
            "define service {\n\thost_name a\n\tservice_description s\n\tcontact_groups +oncall\n}\n",
        )
        .unwrap();
        let svc = &s.services[0];
        assert!(svc.contact_groups.additive);
        assert_eq!(svc.contact_groups.value(), Some("oncall"));
    }
}
