//! Flattened object cache serialization
//!
//! Walks every kind's real-name index in sorted order and writes the records
//! back out in the `define` grammar, fully flattened: no templates, no group
//! references, no additive markers. Field order is fixed per kind and
//! numbers/booleans/option sets use one canonical formatting, so identical
//! configurations always produce byte-identical caches. A cache file fed
//! back in with the pre-cached option skips resolution and duplication
//! entirely.

use std::io::Write;

use crate::constants::CACHE_BANNER;
use crate::records::{
    Attr, Command, Contact, Group, Host, HostDependency, HostEscalation, HostExtInfo, ListAttr,
    ObjectKind, Service, ServiceDependency, ServiceEscalation, ServiceExtInfo, Timeperiod,
    DAY_NAMES,
};
use crate::session::LoadSession;

/// Incremental `define` block renderer with the cache's canonical
/// formatting.
struct Block {
    buf: String,
}

impl Block {
    fn new(kind: ObjectKind) -> Self {
        Block {
            buf: format!("define {} {{\n", kind.as_str()),
        }
    }

    fn raw(&mut self, directive: &str, value: &str) {
        self.buf.push('\t');
        self.buf.push_str(directive);
        self.buf.push('\t');
        self.buf.push_str(value);
        self.buf.push('\n');
    }

    fn string(&mut self, directive: &str, attr: &Attr<String>) {
        if let Some(value) = attr.value() {
            self.raw(directive, value);
        }
    }

    fn list(&mut self, directive: &str, attr: &ListAttr) {
        if let Some(value) = attr.value() {
            if !value.is_empty() {
                self.raw(directive, value);
            }
        }
    }

    fn number(&mut self, directive: &str, attr: &Attr<u32>) {
        if let Some(value) = attr.value() {
            self.raw(directive, &value.to_string());
        }
    }

    fn flag(&mut self, directive: &str, attr: &Attr<bool>) {
        if let Some(value) = attr.value() {
            self.raw(directive, if *value { "1" } else { "0" });
        }
    }

    fn finish(mut self) -> String {
        self.buf.push_str("\t}\n\n");
        self.buf
    }
}

macro_rules! options {
    ($block:expr, $directive:expr, $attr:expr) => {
        if let Some(value) = $attr.value() {
            $block.raw($directive, &value.tokens());
        }
    };
}

pub(crate) fn timeperiod_block(tp: &Timeperiod) -> String {
    let mut b = Block::new(ObjectKind::Timeperiod);
    b.string("timeperiod_name", &tp.timeperiod_name);
    b.string("alias", &tp.alias);
    for (day, ranges) in DAY_NAMES.iter().zip(tp.days.iter()) {
        b.string(day, ranges);
    }
    b.finish()
}

pub(crate) fn command_block(cmd: &Command) -> String {
    let mut b = Block::new(ObjectKind::Command);
    b.string("command_name", &cmd.command_name);
    b.string("command_line", &cmd.command_line);
    b.finish()
}

pub(crate) fn contact_block(contact: &Contact) -> String {
    let mut b = Block::new(ObjectKind::Contact);
    b.string("contact_name", &contact.contact_name);
    b.string("alias", &contact.alias);
    b.string("email", &contact.email);
    b.string("pager", &contact.pager);
    b.string("host_notification_period", &contact.host_notification_period);
    b.string("service_notification_period", &contact.service_notification_period);
    options!(b, "host_notification_options", contact.host_notification_options);
    options!(b, "service_notification_options", contact.service_notification_options);
    b.list("host_notification_commands", &contact.host_notification_commands);
    b.list("service_notification_commands", &contact.service_notification_commands);
    b.flag("host_notifications_enabled", &contact.host_notifications_enabled);
    b.flag("service_notifications_enabled", &contact.service_notifications_enabled);
    for var in &contact.custom_vars {
        b.raw(&format!("_{}", var.name), &var.value);
    }
    b.finish()
}

/// Group blocks share a renderer; only the name directive differs by kind.
pub(crate) fn group_block(kind: ObjectKind, group: &Group) -> String {
    let name_directive = match kind {
        ObjectKind::Contactgroup => "contactgroup_name",
        ObjectKind::Hostgroup => "hostgroup_name",
        _ => "servicegroup_name",
    };
    let mut b = Block::new(kind);
    if let Some(name) = group.group_name.as_deref() {
        b.raw(name_directive, name);
    }
    b.string("alias", &group.alias);
    b.list("members", &group.members);
    b.finish()
}

pub(crate) fn host_block(host: &Host) -> String {
    let mut b = Block::new(ObjectKind::Host);
    b.string("host_name", &host.host_name);
    b.string("alias", &host.alias);
    b.string("address", &host.address);
    b.list("parents", &host.parents);
    b.string("check_command", &host.check_command);
    b.string("check_period", &host.check_period);
    b.number("check_interval", &host.check_interval);
    b.number("retry_interval", &host.retry_interval);
    b.number("max_check_attempts", &host.max_check_attempts);
    b.flag("active_checks_enabled", &host.active_checks_enabled);
    b.list("contact_groups", &host.contact_groups);
    b.list("contacts", &host.contacts);
    b.string("notification_period", &host.notification_period);
    b.number("notification_interval", &host.notification_interval);
    options!(b, "notification_options", host.notification_options);
    b.flag("notifications_enabled", &host.notifications_enabled);
    for var in &host.custom_vars {
        b.raw(&format!("_{}", var.name), &var.value);
    }
    b.finish()
}

pub(crate) fn service_block(svc: &Service) -> String {
    let mut b = Block::new(ObjectKind::Service);
    b.list("host_name", &svc.host_name);
    b.string("service_description", &svc.service_description);
    b.string("check_command", &svc.check_command);
    b.string("check_period", &svc.check_period);
    b.number("check_interval", &svc.check_interval);
    b.number("retry_interval", &svc.retry_interval);
    b.number("max_check_attempts", &svc.max_check_attempts);
    b.flag("is_volatile", &svc.is_volatile);
    b.flag("active_checks_enabled", &svc.active_checks_enabled);
    b.list("contact_groups", &svc.contact_groups);
    b.list("contacts", &svc.contacts);
    b.string("notification_period", &svc.notification_period);
    b.number("notification_interval", &svc.notification_interval);
    options!(b, "notification_options", svc.notification_options);
    b.flag("notifications_enabled", &svc.notifications_enabled);
    for var in &svc.custom_vars {
        b.raw(&format!("_{}", var.name), &var.value);
    }
    b.finish()
}

pub(crate) fn hostdependency_block(dep: &HostDependency) -> String {
    let mut b = Block::new(ObjectKind::HostDependency);
    b.list("host_name", &dep.host_name);
    b.list("dependent_host_name", &dep.dependent_host_name);
    b.flag("inherits_parent", &dep.inherits_parent);
    options!(b, "execution_failure_options", dep.execution_failure_options);
    options!(b, "notification_failure_options", dep.notification_failure_options);
    b.string("dependency_period", &dep.dependency_period);
    b.finish()
}

pub(crate) fn servicedependency_block(dep: &ServiceDependency) -> String {
    let mut b = Block::new(ObjectKind::ServiceDependency);
    b.list("host_name", &dep.host_name);
    b.list("service_description", &dep.service_description);
    b.list("dependent_host_name", &dep.dependent_host_name);
    b.list("dependent_service_description", &dep.dependent_service_description);
    b.flag("inherits_parent", &dep.inherits_parent);
    options!(b, "execution_failure_options", dep.execution_failure_options);
    options!(b, "notification_failure_options", dep.notification_failure_options);
    b.string("dependency_period", &dep.dependency_period);
    b.finish()
}

pub(crate) fn hostescalation_block(esc: &HostEscalation) -> String {
    let mut b = Block::new(ObjectKind::HostEscalation);
    b.list("host_name", &esc.host_name);
    b.number("first_notification", &esc.first_notification);
    b.number("last_notification", &esc.last_notification);
    b.number("notification_interval", &esc.notification_interval);
    b.string("escalation_period", &esc.escalation_period);
    options!(b, "escalation_options", esc.escalation_options);
    b.list("contact_groups", &esc.contact_groups);
    b.list("contacts", &esc.contacts);
    b.finish()
}

pub(crate) fn serviceescalation_block(esc: &ServiceEscalation) -> String {
    let mut b = Block::new(ObjectKind::ServiceEscalation);
    b.list("host_name", &esc.host_name);
    b.list("service_description", &esc.service_description);
    b.number("first_notification", &esc.first_notification);
    b.number("last_notification", &esc.last_notification);
    b.number("notification_interval", &esc.notification_interval);
    b.string("escalation_period", &esc.escalation_period);
    options!(b, "escalation_options", esc.escalation_options);
    b.list("contact_groups", &esc.contact_groups);
    b.list("contacts", &esc.contacts);
    b.finish()
}

pub(crate) fn hostextinfo_block(info: &HostExtInfo) -> String {
    let mut b = Block::new(ObjectKind::HostExtInfo);
    b.list("host_name", &info.host_name);
    b.string("notes", &info.notes);
    b.string("notes_url", &info.notes_url);
    b.string("action_url", &info.action_url);
    b.string("icon_image", &info.icon_image);
    b.string("icon_image_alt", &info.icon_image_alt);
    b.finish()
}

pub(crate) fn serviceextinfo_block(info: &ServiceExtInfo) -> String {
    let mut b = Block::new(ObjectKind::ServiceExtInfo);
    b.list("host_name", &info.host_name);
    b.string("service_description", &info.service_description);
    b.string("notes", &info.notes);
    b.string("notes_url", &info.notes_url);
    b.string("action_url", &info.action_url);
    b.string("icon_image", &info.icon_image);
    b.string("icon_image_alt", &info.icon_image_alt);
    b.finish()
}

/// Serialize every registration-flagged record, in index order.
pub(crate) fn write_cache<W: Write>(session: &LoadSession, out: &mut W) -> std::io::Result<()> {
    out.write_all(CACHE_BANNER.as_bytes())?;
    out.write_all(b"\n")?;

    for (_, id) in session.timeperiod_index.iter() {
        let tp = &session.timeperiods[*id];
        if tp.meta.register {
            out.write_all(timeperiod_block(tp).as_bytes())?;
        }
    }
    for (_, id) in session.command_index.iter() {
        let cmd = &session.commands[*id];
        if cmd.meta.register {
            out.write_all(command_block(cmd).as_bytes())?;
        }
    }
    for (_, id) in session.contactgroup_index.iter() {
        let group = &session.contactgroups[*id];
        if group.meta.register {
            out.write_all(group_block(ObjectKind::Contactgroup, group).as_bytes())?;
        }
    }
    for (_, id) in session.hostgroup_index.iter() {
        let group = &session.hostgroups[*id];
        if group.meta.register {
            out.write_all(group_block(ObjectKind::Hostgroup, group).as_bytes())?;
        }
    }
    for (_, id) in session.servicegroup_index.iter() {
        let group = &session.servicegroups[*id];
        if group.meta.register {
            out.write_all(group_block(ObjectKind::Servicegroup, group).as_bytes())?;
        }
    }
    for (_, id) in session.contact_index.iter() {
        let contact = &session.contacts[*id];
        if contact.meta.register {
            out.write_all(contact_block(contact).as_bytes())?;
        }
    }
    for (_, id) in session.host_index.iter() {
        let host = &session.hosts[*id];
        if host.meta.register {
            out.write_all(host_block(host).as_bytes())?;
        }
    }
    for (_, id) in session.service_index.iter() {
        let svc = &session.services[*id];
        if svc.meta.register {
            out.write_all(service_block(svc).as_bytes())?;
        }
    }
    for (_, id) in session.servicedependency_index.iter() {
        let dep = &session.servicedependencies[*id];
        if dep.meta.register {
            out.write_all(servicedependency_block(dep).as_bytes())?;
        }
    }
    for (_, id) in session.serviceescalation_index.iter() {
        let esc = &session.serviceescalations[*id];
        if esc.meta.register {
            out.write_all(serviceescalation_block(esc).as_bytes())?;
        }
    }
    for (_, id) in session.hostdependency_index.iter() {
        let dep = &session.hostdependencies[*id];
        if dep.meta.register {
            out.write_all(hostdependency_block(dep).as_bytes())?;
        }
    }
    for (_, id) in session.hostescalation_index.iter() {
        let esc = &session.hostescalations[*id];
        if esc.meta.register {
            out.write_all(hostescalation_block(esc).as_bytes())?;
        }
    }
    for (_, id) in session.hostextinfo_index.iter() {
        let info = &session.hostextinfo[*id];
        if info.meta.register {
            out.write_all(hostextinfo_block(info).as_bytes())?;
        }
    }
    for (_, id) in session.serviceextinfo_index.iter() {
        let info = &session.serviceextinfo[*id];
        if info.meta.register {
            out.write_all(serviceextinfo_block(info).as_bytes())?;
        }
    }

    Ok(())
}
