//! Template resolution
//!
//! Applies `use`-chain inheritance across records of one kind. Resolution is
//! depth-first (parents resolve before children), memoized through the
//! `resolved` flag, and guarded against `use` cycles with an in-progress
//! mark. Scalar attributes adopt the parent's value only when never set;
//! list attributes additionally support additive concatenation.

use std::path::PathBuf;

use crate::errors::LoadError;
use crate::records::{
    inherit_custom_vars, Command, Contact, Group, Host, HostDependency, HostEscalation,
    HostExtInfo, ObjectKind, RecordMeta, Service, ServiceDependency, ServiceEscalation,
    ServiceExtInfo, Timeperiod,
};
use crate::session::LoadSession;
use crate::skiplist::SkipList;

/// A record kind that supports template inheritance.
pub(crate) trait Resolvable: Clone {
    fn meta(&self) -> &RecordMeta;
    fn meta_mut(&mut self) -> &mut RecordMeta;
    /// Merge a resolved parent template into this record.
    fn inherit_from_template(&mut self, parent: &Self);
}

/// Resolve every record of every kind.
pub(crate) fn resolve_objects(session: &mut LoadSession) -> Result<(), LoadError> {
    macro_rules! resolve_arena {
        ($arena:ident, $kind:expr) => {
            resolve_kind(
                &mut session.$arena,
                &session.template_index[$kind.ordinal()],
                $kind,
                &session.files,
            )?;
        };
    }

    resolve_arena!(timeperiods, ObjectKind::Timeperiod);
    resolve_arena!(commands, ObjectKind::Command);
    resolve_arena!(contacts, ObjectKind::Contact);
    resolve_arena!(contactgroups, ObjectKind::Contactgroup);
    resolve_arena!(hosts, ObjectKind::Host);
    resolve_arena!(hostgroups, ObjectKind::Hostgroup);
    resolve_arena!(services, ObjectKind::Service);
    resolve_arena!(servicegroups, ObjectKind::Servicegroup);
    resolve_arena!(servicedependencies, ObjectKind::ServiceDependency);
    resolve_arena!(serviceescalations, ObjectKind::ServiceEscalation);
    resolve_arena!(hostdependencies, ObjectKind::HostDependency);
    resolve_arena!(hostescalations, ObjectKind::HostEscalation);
    resolve_arena!(hostextinfo, ObjectKind::HostExtInfo);
    resolve_arena!(serviceextinfo, ObjectKind::ServiceExtInfo);
    Ok(())
}

fn resolve_kind<T: Resolvable>(
    arena: &mut [T],
    templates: &SkipList<String, usize>,
    kind: ObjectKind,
    files: &[PathBuf],
) -> Result<(), LoadError> {
    for id in 0..arena.len() {
        resolve_record(arena, templates, kind, id, files)?;
    }
    Ok(())
}

fn resolve_record<T: Resolvable>(
    arena: &mut [T],
    templates: &SkipList<String, usize>,
    kind: ObjectKind,
    id: usize,
    files: &[PathBuf],
) -> Result<(), LoadError> {
    // Idempotent: a record resolves exactly once.
    if arena[id].meta().resolved {
        return Ok(());
    }
    if arena[id].meta().resolving {
        let prov = arena[id].meta().provenance;
        return Err(LoadError::TemplateCycle {
            kind,
            file: file_label(files, prov.file),
            line: prov.line,
        });
    }
    arena[id].meta_mut().resolving = true;

    if let Some(parents) = arena[id].meta().use_templates.clone() {
        for parent_name in parents.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let pid = match templates.find_first(&parent_name.to_string()) {
                Some(pid) => *pid,
                None => {
                    let prov = arena[id].meta().provenance;
                    return Err(LoadError::UnresolvedTemplate {
                        kind,
                        name: parent_name.to_string(),
                        file: file_label(files, prov.file),
                        line: prov.line,
                    });
                }
            };
            resolve_record(arena, templates, kind, pid, files)?;
            let parent = arena[pid].clone();
            arena[id].inherit_from_template(&parent);
        }
    }

    let meta = arena[id].meta_mut();
    meta.resolving = false;
    meta.resolved = true;
    Ok(())
}

fn file_label(files: &[PathBuf], id: usize) -> String {
    files
        .get(id)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

macro_rules! impl_meta_access {
    () => {
        fn meta(&self) -> &RecordMeta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut RecordMeta {
            &mut self.meta
        }
    };
}

impl Resolvable for Timeperiod {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.timeperiod_name.inherit_from(&t.timeperiod_name);
        self.alias.inherit_from(&t.alias);
        for (day, parent_day) in self.days.iter_mut().zip(t.days.iter()) {
            day.inherit_from(parent_day);
        }
    }
}

impl Resolvable for Command {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.command_name.inherit_from(&t.command_name);
        self.command_line.inherit_from(&t.command_line);
    }
}

impl Resolvable for Contact {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.contact_name.inherit_from(&t.contact_name);
        self.alias.inherit_from(&t.alias);
        self.email.inherit_from(&t.email);
        self.pager.inherit_from(&t.pager);
        self.contactgroups.inherit_from(&t.contactgroups);
        self.host_notification_period.inherit_from(&t.host_notification_period);
        self.service_notification_period.inherit_from(&t.service_notification_period);
        self.host_notification_options.inherit_from(&t.host_notification_options);
        self.service_notification_options.inherit_from(&t.service_notification_options);
        self.host_notification_commands.inherit_from(&t.host_notification_commands);
        self.service_notification_commands.inherit_from(&t.service_notification_commands);
        self.host_notifications_enabled.inherit_from(&t.host_notifications_enabled);
        self.service_notifications_enabled.inherit_from(&t.service_notifications_enabled);
        inherit_custom_vars(&mut self.custom_vars, &t.custom_vars);
    }
}

impl Resolvable for Group {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.group_name.inherit_from(&t.group_name);
        self.alias.inherit_from(&t.alias);
        self.members.inherit_from(&t.members);
        self.group_members.inherit_from(&t.group_members);
    }
}

impl Resolvable for Host {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.host_name.inherit_from(&t.host_name);
        self.alias.inherit_from(&t.alias);
        self.address.inherit_from(&t.address);
        self.parents.inherit_from(&t.parents);
        self.hostgroups.inherit_from(&t.hostgroups);
        self.check_command.inherit_from(&t.check_command);
        self.check_period.inherit_from(&t.check_period);
        self.check_interval.inherit_from(&t.check_interval);
        self.retry_interval.inherit_from(&t.retry_interval);
        self.max_check_attempts.inherit_from(&t.max_check_attempts);
        self.active_checks_enabled.inherit_from(&t.active_checks_enabled);
        self.contact_groups.inherit_from(&t.contact_groups);
        self.contacts.inherit_from(&t.contacts);
        self.notification_period.inherit_from(&t.notification_period);
        self.notification_interval.inherit_from(&t.notification_interval);
        self.notification_options.inherit_from(&t.notification_options);
        self.notifications_enabled.inherit_from(&t.notifications_enabled);
        inherit_custom_vars(&mut self.custom_vars, &t.custom_vars);
    }
}

impl Resolvable for Service {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.host_name.inherit_from(&t.host_name);
        self.hostgroup_name.inherit_from(&t.hostgroup_name);
        self.service_description.inherit_from(&t.service_description);
        self.servicegroups.inherit_from(&t.servicegroups);
        self.check_command.inherit_from(&t.check_command);
        self.check_period.inherit_from(&t.check_period);
        self.check_interval.inherit_from(&t.check_interval);
        self.retry_interval.inherit_from(&t.retry_interval);
        self.max_check_attempts.inherit_from(&t.max_check_attempts);
        self.is_volatile.inherit_from(&t.is_volatile);
        self.active_checks_enabled.inherit_from(&t.active_checks_enabled);
        self.contact_groups.inherit_from(&t.contact_groups);
        self.contacts.inherit_from(&t.contacts);
        self.notification_period.inherit_from(&t.notification_period);
        self.notification_interval.inherit_from(&t.notification_interval);
        self.notification_options.inherit_from(&t.notification_options);
        self.notifications_enabled.inherit_from(&t.notifications_enabled);
        inherit_custom_vars(&mut self.custom_vars, &t.custom_vars);
    }
}

impl Resolvable for HostDependency {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.dependent_host_name.inherit_from(&t.dependent_host_name);
        self.dependent_hostgroup_name.inherit_from(&t.dependent_hostgroup_name);
        self.host_name.inherit_from(&t.host_name);
        self.hostgroup_name.inherit_from(&t.hostgroup_name);
        self.inherits_parent.inherit_from(&t.inherits_parent);
        self.execution_failure_options.inherit_from(&t.execution_failure_options);
        self.notification_failure_options.inherit_from(&t.notification_failure_options);
        self.dependency_period.inherit_from(&t.dependency_period);
    }
}

impl Resolvable for ServiceDependency {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.dependent_host_name.inherit_from(&t.dependent_host_name);
        self.dependent_hostgroup_name.inherit_from(&t.dependent_hostgroup_name);
        self.dependent_service_description.inherit_from(&t.dependent_service_description);
        self.host_name.inherit_from(&t.host_name);
        self.hostgroup_name.inherit_from(&t.hostgroup_name);
        self.service_description.inherit_from(&t.service_description);
        self.inherits_parent.inherit_from(&t.inherits_parent);
        self.execution_failure_options.inherit_from(&t.execution_failure_options);
        self.notification_failure_options.inherit_from(&t.notification_failure_options);
        self.dependency_period.inherit_from(&t.dependency_period);
    }
}

impl Resolvable for HostEscalation {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.host_name.inherit_from(&t.host_name);
        self.hostgroup_name.inherit_from(&t.hostgroup_name);
        self.first_notification.inherit_from(&t.first_notification);
        self.last_notification.inherit_from(&t.last_notification);
        self.notification_interval.inherit_from(&t.notification_interval);
        self.escalation_period.inherit_from(&t.escalation_period);
        self.escalation_options.inherit_from(&t.escalation_options);
        self.contact_groups.inherit_from(&t.contact_groups);
        self.contacts.inherit_from(&t.contacts);
    }
}

impl Resolvable for ServiceEscalation {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.host_name.inherit_from(&t.host_name);
        self.hostgroup_name.inherit_from(&t.hostgroup_name);
        self.service_description.inherit_from(&t.service_description);
        self.first_notification.inherit_from(&t.first_notification);
        self.last_notification.inherit_from(&t.last_notification);
        self.notification_interval.inherit_from(&t.notification_interval);
        self.escalation_period.inherit_from(&t.escalation_period);
        self.escalation_options.inherit_from(&t.escalation_options);
        self.contact_groups.inherit_from(&t.contact_groups);
        self.contacts.inherit_from(&t.contacts);
    }
}

impl Resolvable for HostExtInfo {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.host_name.inherit_from(&t.host_name);
        self.hostgroup_name.inherit_from(&t.hostgroup_name);
        self.notes.inherit_from(&t.notes);
        self.notes_url.inherit_from(&t.notes_url);
        self.action_url.inherit_from(&t.action_url);
        self.icon_image.inherit_from(&t.icon_image);
        self.icon_image_alt.inherit_from(&t.icon_image_alt);
    }
}

impl Resolvable for ServiceExtInfo {
    impl_meta_access!();

    fn inherit_from_template(&mut self, t: &Self) {
        self.host_name.inherit_from(&t.host_name);
        self.hostgroup_name.inherit_from(&t.hostgroup_name);
        self.service_description.inherit_from(&t.service_description);
        self.notes.inherit_from(&t.notes);
        self.notes_url.inherit_from(&t.notes_url);
        self.action_url.inherit_from(&t.action_url);
        self.icon_image.inherit_from(&t.icon_image);
        self.icon_image_alt.inherit_from(&t.icon_image_alt);
    }
}
