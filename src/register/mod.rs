//! Registration with the runtime object model
//!
//! The final pipeline stage walks each kind's real-name index in sorted
//! order and hands every registration-flagged record to an external
//! [`ObjectBuilder`]: one create call per entity, then one attach call per
//! list element (parent host, contact, contact group, group member,
//! notification command, custom variable). Any builder failure aborts the
//! load.
//!
//! This module also hosts the cross-object default-inheritance pass that
//! runs after duplication: services fill notification defaults from their
//! concrete host, escalations from their service or host. The additive list
//! flag participates one last time here and is scrubbed afterwards.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache;
use crate::errors::{BuildError, LoadError};
use crate::records::{
    Contact, Host, HostDependency, HostEscalation, HostExtInfo, Service, ServiceDependency,
    ServiceEscalation, ServiceExtInfo, Timeperiod,
};
use crate::session::LoadSession;

/// Opaque handle for attaching members to an anonymous entity (escalations
/// have no identifying name of their own).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationHandle(pub usize);

/// Which notification command list a contact attachment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifySlot {
    Host,
    Service,
}

/// External object-model builder. One create call per concrete entity, one
/// attach call per list element; returning an error aborts the load.
pub trait ObjectBuilder {
    fn add_timeperiod(&mut self, tp: &Timeperiod) -> Result<(), BuildError>;
    fn add_command(&mut self, name: &str, line: &str) -> Result<(), BuildError>;

    fn add_contact(&mut self, contact: &Contact) -> Result<(), BuildError>;
    fn add_notification_command_to_contact(
        &mut self,
        contact: &str,
        command: &str,
        slot: NotifySlot,
    ) -> Result<(), BuildError>;
    fn add_customvar_to_contact(
        &mut self,
        contact: &str,
        name: &str,
        value: &str,
    ) -> Result<(), BuildError>;

    fn add_contactgroup(&mut self, group: &str, alias: &str) -> Result<(), BuildError>;
    fn add_member_to_contactgroup(&mut self, group: &str, contact: &str)
        -> Result<(), BuildError>;

    fn add_host(&mut self, host: &Host) -> Result<(), BuildError>;
    fn add_parent_to_host(&mut self, host: &str, parent: &str) -> Result<(), BuildError>;
    fn add_contact_to_host(&mut self, host: &str, contact: &str) -> Result<(), BuildError>;
    fn add_contactgroup_to_host(&mut self, host: &str, group: &str) -> Result<(), BuildError>;
    fn add_customvar_to_host(
        &mut self,
        host: &str,
        name: &str,
        value: &str,
    ) -> Result<(), BuildError>;

    fn add_hostgroup(&mut self, group: &str, alias: &str) -> Result<(), BuildError>;
    fn add_member_to_hostgroup(&mut self, group: &str, host: &str) -> Result<(), BuildError>;

    fn add_service(&mut self, service: &Service) -> Result<(), BuildError>;
    fn add_contact_to_service(
        &mut self,
        host: &str,
        description: &str,
        contact: &str,
    ) -> Result<(), BuildError>;
    fn add_contactgroup_to_service(
        &mut self,
        host: &str,
        description: &str,
        group: &str,
    ) -> Result<(), BuildError>;
    fn add_customvar_to_service(
        &mut self,
        host: &str,
        description: &str,
        name: &str,
        value: &str,
    ) -> Result<(), BuildError>;

    fn add_servicegroup(&mut self, group: &str, alias: &str) -> Result<(), BuildError>;
    fn add_member_to_servicegroup(
        &mut self,
        group: &str,
        host: &str,
        description: &str,
    ) -> Result<(), BuildError>;

    fn add_hostdependency(&mut self, dep: &HostDependency) -> Result<(), BuildError>;
    fn add_servicedependency(&mut self, dep: &ServiceDependency) -> Result<(), BuildError>;

    fn add_hostescalation(&mut self, esc: &HostEscalation)
        -> Result<EscalationHandle, BuildError>;
    fn add_contact_to_hostescalation(
        &mut self,
        esc: EscalationHandle,
        contact: &str,
    ) -> Result<(), BuildError>;
    fn add_contactgroup_to_hostescalation(
        &mut self,
        esc: EscalationHandle,
        group: &str,
    ) -> Result<(), BuildError>;

    fn add_serviceescalation(
        &mut self,
        esc: &ServiceEscalation,
    ) -> Result<EscalationHandle, BuildError>;
    fn add_contact_to_serviceescalation(
        &mut self,
        esc: EscalationHandle,
        contact: &str,
    ) -> Result<(), BuildError>;
    fn add_contactgroup_to_serviceescalation(
        &mut self,
        esc: EscalationHandle,
        group: &str,
    ) -> Result<(), BuildError>;

    fn add_hostextinfo(&mut self, info: &HostExtInfo) -> Result<(), BuildError>;
    fn add_serviceextinfo(&mut self, info: &ServiceExtInfo) -> Result<(), BuildError>;
}

/// Per-kind counts of created entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrationSummary {
    pub timeperiods: usize,
    pub commands: usize,
    pub contacts: usize,
    pub contactgroups: usize,
    pub hosts: usize,
    pub hostgroups: usize,
    pub services: usize,
    pub servicegroups: usize,
    pub servicedependencies: usize,
    pub serviceescalations: usize,
    pub hostdependencies: usize,
    pub hostescalations: usize,
    pub hostextinfo: usize,
    pub serviceextinfo: usize,
}

impl RegistrationSummary {
    pub fn total(&self) -> usize {
        self.timeperiods
            + self.commands
            + self.contacts
            + self.contactgroups
            + self.hosts
            + self.hostgroups
            + self.services
            + self.servicegroups
            + self.servicedependencies
            + self.serviceescalations
            + self.hostdependencies
            + self.hostescalations
            + self.hostextinfo
            + self.serviceextinfo
    }
}

/// Cross-object default inheritance: runs after duplication so every
/// service names one concrete host. Unset (or still-additive) notification
/// attributes fill in from the runtime parent object, then the additive
/// flags are scrubbed - every inheritance consumer has now run.
pub(crate) fn inherit_object_properties(session: &mut LoadSession) -> Result<(), LoadError> {
    // Services inherit from their host.
    for sid in 0..session.services.len() {
        let Some(host_name) = session.services[sid].host_name.value().map(str::to_string) else {
            continue;
        };
        let Some(hid) = session.host_index.find_first(&host_name).copied() else {
            continue;
        };
        let host = &session.hosts[hid];
        let contact_groups = host.contact_groups.clone();
        let contacts = host.contacts.clone();
        let notification_interval = host.notification_interval.clone();
        let notification_period = host.notification_period.clone();

        let svc = &mut session.services[sid];
        svc.contact_groups.inherit_from(&contact_groups);
        svc.contacts.inherit_from(&contacts);
        svc.notification_interval.inherit_from(&notification_interval);
        svc.notification_period.inherit_from(&notification_period);
    }

    // Service escalations inherit from their service.
    for eid in 0..session.serviceescalations.len() {
        let esc = &session.serviceescalations[eid];
        let (Some(host), Some(desc)) = (
            esc.host_name.value().map(str::to_string),
            esc.service_description.value().map(str::to_string),
        ) else {
            continue;
        };
        let Some(sid) = session.service_index.find_first(&(host, desc)).copied() else {
            continue;
        };
        let svc = &session.services[sid];
        let contact_groups = svc.contact_groups.clone();
        let contacts = svc.contacts.clone();
        let notification_interval = svc.notification_interval.clone();
        let notification_period = svc.notification_period.clone();

        let esc = &mut session.serviceescalations[eid];
        esc.contact_groups.inherit_from(&contact_groups);
        esc.contacts.inherit_from(&contacts);
        esc.notification_interval.inherit_from(&notification_interval);
        esc.escalation_period.inherit_from(&notification_period);
    }

    // Host escalations inherit from their host.
    for eid in 0..session.hostescalations.len() {
        let Some(host_name) = session.hostescalations[eid].host_name.value().map(str::to_string)
        else {
            continue;
        };
        let Some(hid) = session.host_index.find_first(&host_name).copied() else {
            continue;
        };
        let host = &session.hosts[hid];
        let contact_groups = host.contact_groups.clone();
        let contacts = host.contacts.clone();
        let notification_interval = host.notification_interval.clone();
        let notification_period = host.notification_period.clone();

        let esc = &mut session.hostescalations[eid];
        esc.contact_groups.inherit_from(&contact_groups);
        esc.contacts.inherit_from(&contacts);
        esc.notification_interval.inherit_from(&notification_interval);
        esc.escalation_period.inherit_from(&notification_period);
    }

    scrub_additive_flags(session);
    Ok(())
}

/// Drop the additive markers once no inheritance consumer remains.
fn scrub_additive_flags(session: &mut LoadSession) {
    for host in &mut session.hosts {
        host.parents.additive = false;
        host.hostgroups.additive = false;
        host.contact_groups.additive = false;
        host.contacts.additive = false;
    }
    for svc in &mut session.services {
        svc.host_name.additive = false;
        svc.hostgroup_name.additive = false;
        svc.servicegroups.additive = false;
        svc.contact_groups.additive = false;
        svc.contacts.additive = false;
    }
    for contact in &mut session.contacts {
        contact.contactgroups.additive = false;
        contact.host_notification_commands.additive = false;
        contact.service_notification_commands.additive = false;
    }
    for group in session
        .contactgroups
        .iter_mut()
        .chain(session.hostgroups.iter_mut())
        .chain(session.servicegroups.iter_mut())
    {
        group.members.additive = false;
        group.group_members.additive = false;
    }
    for esc in &mut session.hostescalations {
        esc.contact_groups.additive = false;
        esc.contacts.additive = false;
    }
    for esc in &mut session.serviceescalations {
        esc.contact_groups.additive = false;
        esc.contacts.additive = false;
    }
}

fn builder_err(entity: impl Into<String>) -> impl FnOnce(BuildError) -> LoadError {
    let entity = entity.into();
    move |source| LoadError::Builder { entity, source }
}

/// Walk every index in sorted order and register the flattened records.
pub(crate) fn register_objects<B: ObjectBuilder>(
    session: &LoadSession,
    builder: &mut B,
) -> Result<RegistrationSummary, LoadError> {
    let mut summary = RegistrationSummary::default();

    for (name, id) in session.timeperiod_index.iter() {
        let tp = &session.timeperiods[*id];
        if !tp.meta.register {
            continue;
        }
        builder
            .add_timeperiod(tp)
            .map_err(builder_err(format!("timeperiod '{}'", name)))?;
        summary.timeperiods += 1;
    }

    for (name, id) in session.command_index.iter() {
        let cmd = &session.commands[*id];
        if !cmd.meta.register {
            continue;
        }
        let line = cmd.command_line.as_deref().unwrap_or("");
        builder
            .add_command(name, line)
            .map_err(builder_err(format!("command '{}'", name)))?;
        summary.commands += 1;
    }

    for (name, id) in session.contactgroup_index.iter() {
        let group = &session.contactgroups[*id];
        if !group.meta.register {
            continue;
        }
        let alias = group.alias.as_deref().unwrap_or(name);
        builder
            .add_contactgroup(name, alias)
            .map_err(builder_err(format!("contactgroup '{}'", name)))?;
        for member in group.members.names() {
            builder
                .add_member_to_contactgroup(name, member)
                .map_err(builder_err(format!("contactgroup '{}'", name)))?;
        }
        summary.contactgroups += 1;
    }

    for (name, id) in session.hostgroup_index.iter() {
        let group = &session.hostgroups[*id];
        if !group.meta.register {
            continue;
        }
        let alias = group.alias.as_deref().unwrap_or(name);
        builder
            .add_hostgroup(name, alias)
            .map_err(builder_err(format!("hostgroup '{}'", name)))?;
        for member in group.members.names() {
            builder
                .add_member_to_hostgroup(name, member)
                .map_err(builder_err(format!("hostgroup '{}'", name)))?;
        }
        summary.hostgroups += 1;
    }

    for (name, id) in session.servicegroup_index.iter() {
        let group = &session.servicegroups[*id];
        if !group.meta.register {
            continue;
        }
        let alias = group.alias.as_deref().unwrap_or(name);
        builder
            .add_servicegroup(name, alias)
            .map_err(builder_err(format!("servicegroup '{}'", name)))?;
        let members: Vec<&str> = group.members.names().collect();
        for pair in members.chunks(2) {
            if let [host, desc] = pair {
                builder
                    .add_member_to_servicegroup(name, host, desc)
                    .map_err(builder_err(format!("servicegroup '{}'", name)))?;
            }
        }
        summary.servicegroups += 1;
    }

    for (name, id) in session.contact_index.iter() {
        let contact = &session.contacts[*id];
        if !contact.meta.register {
            continue;
        }
        builder
            .add_contact(contact)
            .map_err(builder_err(format!("contact '{}'", name)))?;
        for command in contact.host_notification_commands.names() {
            builder
                .add_notification_command_to_contact(name, command, NotifySlot::Host)
                .map_err(builder_err(format!("contact '{}'", name)))?;
        }
        for command in contact.service_notification_commands.names() {
            builder
                .add_notification_command_to_contact(name, command, NotifySlot::Service)
                .map_err(builder_err(format!("contact '{}'", name)))?;
        }
        for var in &contact.custom_vars {
            builder
                .add_customvar_to_contact(name, &var.name, &var.value)
                .map_err(builder_err(format!("contact '{}'", name)))?;
        }
        summary.contacts += 1;
    }

    for (name, id) in session.host_index.iter() {
        let host = &session.hosts[*id];
        if !host.meta.register {
            continue;
        }
        builder
            .add_host(host)
            .map_err(builder_err(format!("host '{}'", name)))?;
        for parent in host.parents.names() {
            builder
                .add_parent_to_host(name, parent)
                .map_err(builder_err(format!("host '{}'", name)))?;
        }
        for group in host.contact_groups.names() {
            builder
                .add_contactgroup_to_host(name, group)
                .map_err(builder_err(format!("host '{}'", name)))?;
        }
        for contact in host.contacts.names() {
            builder
                .add_contact_to_host(name, contact)
                .map_err(builder_err(format!("host '{}'", name)))?;
        }
        for var in &host.custom_vars {
            builder
                .add_customvar_to_host(name, &var.name, &var.value)
                .map_err(builder_err(format!("host '{}'", name)))?;
        }
        summary.hosts += 1;
    }

    for ((host, desc), id) in session.service_index.iter() {
        let svc = &session.services[*id];
        if !svc.meta.register {
            continue;
        }
        let label = format!("service '{};{}'", host, desc);
        builder.add_service(svc).map_err(builder_err(label.clone()))?;
        for group in svc.contact_groups.names() {
            builder
                .add_contactgroup_to_service(host, desc, group)
                .map_err(builder_err(label.clone()))?;
        }
        for contact in svc.contacts.names() {
            builder
                .add_contact_to_service(host, desc, contact)
                .map_err(builder_err(label.clone()))?;
        }
        for var in &svc.custom_vars {
            builder
                .add_customvar_to_service(host, desc, &var.name, &var.value)
                .map_err(builder_err(label.clone()))?;
        }
        summary.services += 1;
    }

    for ((host, desc), id) in session.servicedependency_index.iter() {
        let dep = &session.servicedependencies[*id];
        if !dep.meta.register {
            continue;
        }
        builder
            .add_servicedependency(dep)
            .map_err(builder_err(format!("service dependency '{};{}'", host, desc)))?;
        summary.servicedependencies += 1;
    }

    for ((host, desc), id) in session.serviceescalation_index.iter() {
        let esc = &session.serviceescalations[*id];
        if !esc.meta.register {
            continue;
        }
        let label = format!("service escalation '{};{}'", host, desc);
        let handle = builder
            .add_serviceescalation(esc)
            .map_err(builder_err(label.clone()))?;
        for group in esc.contact_groups.names() {
            builder
                .add_contactgroup_to_serviceescalation(handle, group)
                .map_err(builder_err(label.clone()))?;
        }
        for contact in esc.contacts.names() {
            builder
                .add_contact_to_serviceescalation(handle, contact)
                .map_err(builder_err(label.clone()))?;
        }
        summary.serviceescalations += 1;
    }

    for (host, id) in session.hostdependency_index.iter() {
        let dep = &session.hostdependencies[*id];
        if !dep.meta.register {
            continue;
        }
        builder
            .add_hostdependency(dep)
            .map_err(builder_err(format!("host dependency '{}'", host)))?;
        summary.hostdependencies += 1;
    }

    for (host, id) in session.hostescalation_index.iter() {
        let esc = &session.hostescalations[*id];
        if !esc.meta.register {
            continue;
        }
        let label = format!("host escalation '{}'", host);
        let handle = builder
            .add_hostescalation(esc)
            .map_err(builder_err(label.clone()))?;
        for group in esc.contact_groups.names() {
            builder
                .add_contactgroup_to_hostescalation(handle, group)
                .map_err(builder_err(label.clone()))?;
        }
        for contact in esc.contacts.names() {
            builder
                .add_contact_to_hostescalation(handle, contact)
                .map_err(builder_err(label.clone()))?;
        }
        summary.hostescalations += 1;
    }

    for (host, id) in session.hostextinfo_index.iter() {
        let info = &session.hostextinfo[*id];
        if !info.meta.register {
            continue;
        }
        builder
            .add_hostextinfo(info)
            .map_err(builder_err(format!("host extended info '{}'", host)))?;
        summary.hostextinfo += 1;
    }

    for ((host, desc), id) in session.serviceextinfo_index.iter() {
        let info = &session.serviceextinfo[*id];
        if !info.meta.register {
            continue;
        }
        builder
            .add_serviceextinfo(info)
            .map_err(builder_err(format!("service extended info '{};{}'", host, desc)))?;
        summary.serviceextinfo += 1;
    }

    Ok(summary)
}

/// Builder that keeps a canonical text rendering of everything it receives.
/// Backs the CLI's verify mode and lets tests compare two registration runs
/// for equality.
#[derive(Debug, Default, PartialEq)]
pub struct InMemoryModel {
    /// Entity key -> canonical `define` block.
    pub entities: BTreeMap<String, String>,
    /// Rendered attach calls, in arrival order.
    pub attachments: Vec<String>,
    escalations: usize,
    dependencies: usize,
}

impl InMemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&mut self, key: String, block: String) -> Result<(), BuildError> {
        if self.entities.insert(key.clone(), block).is_some() {
            return Err(BuildError(format!("'{}' already exists", key)));
        }
        Ok(())
    }

    fn attach(&mut self, line: String) -> Result<(), BuildError> {
        self.attachments.push(line);
        Ok(())
    }
}

impl ObjectBuilder for InMemoryModel {
    fn add_timeperiod(&mut self, tp: &Timeperiod) -> Result<(), BuildError> {
        let name = tp.timeperiod_name.as_deref().unwrap_or("").to_string();
        self.create(format!("timeperiod/{}", name), cache::timeperiod_block(tp))
    }

    fn add_command(&mut self, name: &str, line: &str) -> Result<(), BuildError> {
        self.create(format!("command/{}", name), line.to_string())
    }

    fn add_contact(&mut self, contact: &Contact) -> Result<(), BuildError> {
        let name = contact.contact_name.as_deref().unwrap_or("").to_string();
        self.create(format!("contact/{}", name), cache::contact_block(contact))
    }

    fn add_notification_command_to_contact(
        &mut self,
        contact: &str,
        command: &str,
        slot: NotifySlot,
    ) -> Result<(), BuildError> {
        self.attach(format!("contact/{} notify-{:?} {}", contact, slot, command))
    }

    fn add_customvar_to_contact(
        &mut self,
        contact: &str,
        name: &str,
        value: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("contact/{} var {}={}", contact, name, value))
    }

    fn add_contactgroup(&mut self, group: &str, alias: &str) -> Result<(), BuildError> {
        self.create(format!("contactgroup/{}", group), alias.to_string())
    }

    fn add_member_to_contactgroup(
        &mut self,
        group: &str,
        contact: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("contactgroup/{} member {}", group, contact))
    }

    fn add_host(&mut self, host: &Host) -> Result<(), BuildError> {
        let name = host.host_name.as_deref().unwrap_or("").to_string();
        self.create(format!("host/{}", name), cache::host_block(host))
    }

    fn add_parent_to_host(&mut self, host: &str, parent: &str) -> Result<(), BuildError> {
        self.attach(format!("host/{} parent {}", host, parent))
    }

    fn add_contact_to_host(&mut self, host: &str, contact: &str) -> Result<(), BuildError> {
        self.attach(format!("host/{} contact {}", host, contact))
    }

    fn add_contactgroup_to_host(&mut self, host: &str, group: &str) -> Result<(), BuildError> {
        self.attach(format!("host/{} contactgroup {}", host, group))
    }

    fn add_customvar_to_host(
        &mut self,
        host: &str,
        name: &str,
        value: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("host/{} var {}={}", host, name, value))
    }

    fn add_hostgroup(&mut self, group: &str, alias: &str) -> Result<(), BuildError> {
        self.create(format!("hostgroup/{}", group), alias.to_string())
    }

    fn add_member_to_hostgroup(&mut self, group: &str, host: &str) -> Result<(), BuildError> {
        self.attach(format!("hostgroup/{} member {}", group, host))
    }

    fn add_service(&mut self, service: &Service) -> Result<(), BuildError> {
        let key = format!(
            "service/{};{}",
            service.host_name.value().unwrap_or(""),
            service.service_description.as_deref().unwrap_or("")
        );
        self.create(key, cache::service_block(service))
    }

    fn add_contact_to_service(
        &mut self,
        host: &str,
        description: &str,
        contact: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("service/{};{} contact {}", host, description, contact))
    }

    fn add_contactgroup_to_service(
        &mut self,
        host: &str,
        description: &str,
        group: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("service/{};{} contactgroup {}", host, description, group))
    }

    fn add_customvar_to_service(
        &mut self,
        host: &str,
        description: &str,
        name: &str,
        value: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("service/{};{} var {}={}", host, description, name, value))
    }

    fn add_servicegroup(&mut self, group: &str, alias: &str) -> Result<(), BuildError> {
        self.create(format!("servicegroup/{}", group), alias.to_string())
    }

    fn add_member_to_servicegroup(
        &mut self,
        group: &str,
        host: &str,
        description: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("servicegroup/{} member {};{}", group, host, description))
    }

    fn add_hostdependency(&mut self, dep: &HostDependency) -> Result<(), BuildError> {
        let key = format!("hostdependency/{}", self.dependencies);
        self.dependencies += 1;
        self.create(key, cache::hostdependency_block(dep))
    }

    fn add_servicedependency(&mut self, dep: &ServiceDependency) -> Result<(), BuildError> {
        let key = format!("servicedependency/{}", self.dependencies);
        self.dependencies += 1;
        self.create(key, cache::servicedependency_block(dep))
    }

    fn add_hostescalation(
        &mut self,
        esc: &HostEscalation,
    ) -> Result<EscalationHandle, BuildError> {
        let handle = EscalationHandle(self.escalations);
        self.escalations += 1;
        self.create(
            format!("hostescalation/{}", handle.0),
            cache::hostescalation_block(esc),
        )?;
        Ok(handle)
    }

    fn add_contact_to_hostescalation(
        &mut self,
        esc: EscalationHandle,
        contact: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("hostescalation/{} contact {}", esc.0, contact))
    }

    fn add_contactgroup_to_hostescalation(
        &mut self,
        esc: EscalationHandle,
        group: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("hostescalation/{} contactgroup {}", esc.0, group))
    }

    fn add_serviceescalation(
        &mut self,
        esc: &ServiceEscalation,
    ) -> Result<EscalationHandle, BuildError> {
        let handle = EscalationHandle(self.escalations);
        self.escalations += 1;
        self.create(
            format!("serviceescalation/{}", handle.0),
            cache::serviceescalation_block(esc),
        )?;
        Ok(handle)
    }

    fn add_contact_to_serviceescalation(
        &mut self,
        esc: EscalationHandle,
        contact: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("serviceescalation/{} contact {}", esc.0, contact))
    }

    fn add_contactgroup_to_serviceescalation(
        &mut self,
        esc: EscalationHandle,
        group: &str,
    ) -> Result<(), BuildError> {
        self.attach(format!("serviceescalation/{} contactgroup {}", esc.0, group))
    }

    fn add_hostextinfo(&mut self, info: &HostExtInfo) -> Result<(), BuildError> {
        let key = format!("hostextinfo/{}", info.host_name.value().unwrap_or(""));
        self.create(key, cache::hostextinfo_block(info))
    }

    fn add_serviceextinfo(&mut self, info: &ServiceExtInfo) -> Result<(), BuildError> {
        let key = format!(
            "serviceextinfo/{};{}",
            info.host_name.value().unwrap_or(""),
            info.service_description.as_deref().unwrap_or("")
        );
        self.create(key, cache::serviceextinfo_block(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{LoadOptions, LoadSession};

    fn loaded(text: &str) -> LoadSession {
        let mut s = LoadSession::new(LoadOptions {
            index_seed: Some(1),
            ..LoadOptions::default()
        });
        s.load_object_text("test.cfg", text).unwrap();
        s
    }

    #[test]
    fn test_register_counts_and_sorted_walk() {
        let s = loaded(
            "define host {\n\thost_name b\n}\n\
             define host {\n\thost_name a\n}\n\
             define command {\n\tcommand_name ping\n\tcommand_line /bin/ping\n}\n",
        );
        let mut model = InMemoryModel::new();
        let summary = register_objects(&s, &mut model).unwrap();
        assert_eq!(summary.hosts, 2);
        assert_eq!(summary.commands, 1);
        assert_eq!(summary.total(), 3);
        let keys: Vec<&String> = model.entities.keys().collect();
        assert!(keys.contains(&&"host/a".to_string()));
        assert!(keys.contains(&&"host/b".to_string()));
    }

    #[test]
    fn test_templates_are_not_registered() {
        let s = loaded(
            "define host {\n\tname tmpl\n\thost_name also-real\n\tregister 0\n}\n\
             define host {\n\thost_name real\n}\n",
        );
        let mut model = InMemoryModel::new();
        let summary = register_objects(&s, &mut model).unwrap();
        assert_eq!(summary.hosts, 1);
        assert!(model.entities.contains_key("host/real"));
        assert!(!model.entities.contains_key("host/also-real"));
    }

    #[test]
    fn test_attach_calls_per_list_element() {
        let s = loaded(
            "define contact {\n\tcontact_name alice\n}\n\
             define contactgroup {\n\tcontactgroup_name ops\n\tmembers alice\n}\n\
             define host {\n\thost_name h1\n\tcontact_groups ops\n\tcontacts alice\n\t_RACK r1\n}\n\
             define host {\n\thost_name h2\n\tparents h1\n}\n",
        );
        let mut model = InMemoryModel::new();
        register_objects(&s, &mut model).unwrap();
        assert!(model.attachments.contains(&"host/h1 contactgroup ops".to_string()));
        assert!(model.attachments.contains(&"host/h1 contact alice".to_string()));
        assert!(model.attachments.contains(&"host/h1 var RACK=r1".to_string()));
        assert!(model.attachments.contains(&"host/h2 parent h1".to_string()));
        assert!(model.attachments.contains(&"contactgroup/ops member alice".to_string()));
    }

    #[test]
    fn test_service_inherits_host_contacts() {
        let s = loaded(
            "define contact {\n\tcontact_name alice\n}\n\
             define contactgroup {\n\tcontactgroup_name ops\n\tmembers alice\n}\n\
             define host {\n\thost_name h1\n\tcontact_groups ops\n\tnotification_interval 30\n}\n\
             define service {\n\thost_name h1\n\tservice_description ping\n}\n",
        );
        let svc = &s.services[0];
        assert_eq!(svc.contact_groups.value(), Some("ops"));
        assert_eq!(svc.notification_interval.value(), Some(&30));
    }

    #[test]
    fn test_service_additive_contact_groups_extend_host() {
        let s = loaded(
            "define contact {\n\tcontact_name alice\n}\n\
             define contactgroup {\n\tcontactgroup_name ops\n\tmembers alice\n}\n\
             define contactgroup {\n\tcontactgroup_name oncall\n\tmembers alice\n}\n\
             define host {\n\thost_name h1\n\tcontact_groups ops\n}\n\
             define service {\n\thost_name h1\n\tservice_description ping\n\tcontact_groups +oncall\n}\n",
        );
        let svc = &s.services[0];
        assert_eq!(svc.contact_groups.value(), Some("ops,oncall"));
        // Scrubbed after the last inheritance consumer.
        assert!(!svc.contact_groups.additive);
    }

    #[test]
    fn test_escalation_inherits_from_service() {
        let s = loaded(
            "define host {\n\thost_name h1\n\tnotification_period 24x7\n}\n\
             define service {\n\thost_name h1\n\tservice_description ping\n\tnotification_interval 15\n}\n\
             define serviceescalation {\n\thost_name h1\n\tservice_description ping\n\tfirst_notification 2\n}\n",
        );
        let esc = &s.serviceescalations[0];
        assert_eq!(esc.notification_interval.value(), Some(&15));
        assert_eq!(esc.escalation_period.as_deref(), Some("24x7"));
    }

    struct FailingBuilder;

    impl ObjectBuilder for FailingBuilder {
        fn add_timeperiod(&mut self, _: &Timeperiod) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_command(&mut self, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_contact(&mut self, _: &Contact) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_notification_command_to_contact(
            &mut self,
            _: &str,
            _: &str,
            _: NotifySlot,
        ) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_customvar_to_contact(&mut self, _: &str, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_contactgroup(&mut self, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_member_to_contactgroup(&mut self, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_host(&mut self, _: &Host) -> Result<(), BuildError> {
            Err(BuildError("object model is full".to_string()))
        }
        fn add_parent_to_host(&mut self, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_contact_to_host(&mut self, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_contactgroup_to_host(&mut self, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_customvar_to_host(&mut self, _: &str, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_hostgroup(&mut self, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_member_to_hostgroup(&mut self, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_service(&mut self, _: &Service) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_contact_to_service(&mut self, _: &str, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_contactgroup_to_service(
            &mut self,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_customvar_to_service(
            &mut self,
            _: &str,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_servicegroup(&mut self, _: &str, _: &str) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_member_to_servicegroup(
            &mut self,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_hostdependency(&mut self, _: &HostDependency) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_servicedependency(&mut self, _: &ServiceDependency) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_hostescalation(
            &mut self,
            _: &HostEscalation,
        ) -> Result<EscalationHandle, BuildError> {
            Ok(EscalationHandle(0))
        }
        fn add_contact_to_hostescalation(
            &mut self,
            _: EscalationHandle,
            _: &str,
        ) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_contactgroup_to_hostescalation(
            &mut self,
            _: EscalationHandle,
            _: &str,
        ) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_serviceescalation(
            &mut self,
            _: &ServiceEscalation,
        ) -> Result<EscalationHandle, BuildError> {
            Ok(EscalationHandle(0))
        }
        fn add_contact_to_serviceescalation(
            &mut self,
            _: EscalationHandle,
            _: &str,
        ) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_contactgroup_to_serviceescalation(
            &mut self,
            _: EscalationHandle,
            _: &str,
        ) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_hostextinfo(&mut self, _: &HostExtInfo) -> Result<(), BuildError> {
            Ok(())
        }
        fn add_serviceextinfo(&mut self, _: &ServiceExtInfo) -> Result<(), BuildError> {
            Ok(())
        }
    }

    #[test]
    fn test_builder_failure_aborts_registration() {
        let s = loaded("define host {\n\thost_name h1\n}\n");
        let err = register_objects(&s, &mut FailingBuilder).unwrap_err();
        assert!(matches!(err, LoadError::Builder { .. }));
    }
}
