//! Object duplication (fan-out)
//!
//! Definitions that name a group (or several concrete counterparts) expand
//! into one record per resolved member: services, escalations, dependencies
//! and extended-info blocks. The original record is mutated in place to
//! represent the first member; every further member gets a deep copy that
//! keeps the resolved/register flags and provenance verbatim. Dependencies
//! fan out as the cross product of their master and dependent sides.
//!
//! Afterwards the link-kind indexes are filled in two passes - direct-form
//! records first, then group-derived ones - so a group-derived duplicate can
//! never displace or collide with a directly-defined record sharing its key.

use log::debug;

use crate::errors::LoadError;
use crate::expand;
use crate::records::ObjectKind;
use crate::session::LoadSession;

pub(crate) fn duplicate_objects(session: &mut LoadSession) -> Result<(), LoadError> {
    duplicate_services(session)?;
    duplicate_hostescalations(session)?;
    duplicate_serviceescalations(session)?;
    duplicate_hostdependencies(session)?;
    duplicate_servicedependencies(session)?;
    duplicate_hostextinfo(session)?;
    duplicate_serviceextinfo(session)?;
    rebuild_link_indexes(session)
}

fn duplicate_services(session: &mut LoadSession) -> Result<(), LoadError> {
    for sid in 0..session.services.len() {
        let svc = &session.services[sid];
        if !svc.meta.register {
            continue;
        }
        let hostgroups = svc.hostgroup_name.value().map(str::to_string);
        let hosts = svc.host_name.value().map(str::to_string);
        if hostgroups.is_none() && hosts.is_none() {
            continue;
        }
        let context = format!(
            "service '{}' ({}:{})",
            svc.service_description.as_deref().unwrap_or("?"),
            session.file_name(svc.meta.provenance.file),
            svc.meta.provenance.line
        );

        let members = expand::expand_hostgroups_and_hosts(
            session,
            hostgroups.as_deref(),
            hosts.as_deref(),
            &context,
        )?;
        if members.is_empty() {
            return Err(LoadError::UnresolvedMember {
                pattern: hostgroups.or(hosts).unwrap_or_default(),
                context,
            });
        }

        let mut members = members.into_iter();
        if let Some(first) = members.next() {
            let svc = &mut session.services[sid];
            svc.host_name.set_flat(first.name);
            svc.meta.from_group = first.from_group;
        }
        for member in members {
            let mut copy = session.services[sid].clone();
            copy.host_name.set_flat(member.name);
            copy.meta.from_group = member.from_group;
            session.services.push(copy);
        }
    }
    Ok(())
}

fn duplicate_hostescalations(session: &mut LoadSession) -> Result<(), LoadError> {
    for eid in 0..session.hostescalations.len() {
        let esc = &session.hostescalations[eid];
        if !esc.meta.register {
            continue;
        }
        let hostgroups = esc.hostgroup_name.value().map(str::to_string);
        let hosts = esc.host_name.value().map(str::to_string);
        if hostgroups.is_none() && hosts.is_none() {
            continue;
        }
        let context = format!(
            "host escalation ({}:{})",
            session.file_name(esc.meta.provenance.file),
            esc.meta.provenance.line
        );

        let members = expand::expand_hostgroups_and_hosts(
            session,
            hostgroups.as_deref(),
            hosts.as_deref(),
            &context,
        )?;
        if members.is_empty() {
            return Err(LoadError::UnresolvedMember {
                pattern: hostgroups.or(hosts).unwrap_or_default(),
                context,
            });
        }

        let mut members = members.into_iter();
        if let Some(first) = members.next() {
            let esc = &mut session.hostescalations[eid];
            esc.host_name.set_flat(first.name);
            esc.meta.from_group = first.from_group;
        }
        for member in members {
            let mut copy = session.hostescalations[eid].clone();
            copy.host_name.set_flat(member.name);
            copy.meta.from_group = member.from_group;
            session.hostescalations.push(copy);
        }
    }
    Ok(())
}

fn duplicate_serviceescalations(session: &mut LoadSession) -> Result<(), LoadError> {
    for eid in 0..session.serviceescalations.len() {
        let esc = &session.serviceescalations[eid];
        if !esc.meta.register {
            continue;
        }
        let hostgroups = esc.hostgroup_name.value().map(str::to_string);
        let hosts = esc.host_name.value().map(str::to_string);
        if hostgroups.is_none() && hosts.is_none() {
            continue;
        }
        let prov = esc.meta.provenance;
        let context = format!(
            "service escalation ({}:{})",
            session.file_name(prov.file),
            prov.line
        );
        let Some(svc_spec) = esc.service_description.value().map(str::to_string) else {
            return Err(session.parse_error(prov, "service escalation is missing service_description"));
        };

        let members = expand::expand_hostgroups_and_hosts(
            session,
            hostgroups.as_deref(),
            hosts.as_deref(),
            &context,
        )?;
        if members.is_empty() {
            return Err(LoadError::UnresolvedMember {
                pattern: hostgroups.or(hosts).unwrap_or_default(),
                context,
            });
        }

        let mut pairs: Vec<(String, String, bool)> = Vec::new();
        for member in &members {
            let descs = expand::expand_services(session, &member.name, &svc_spec, &context)?;
            if descs.is_empty() {
                return Err(LoadError::UnresolvedMember {
                    pattern: svc_spec,
                    context,
                });
            }
            for desc in descs {
                pairs.push((member.name.clone(), desc, member.from_group));
            }
        }

        let mut pairs = pairs.into_iter();
        if let Some((host, desc, from_group)) = pairs.next() {
            let esc = &mut session.serviceescalations[eid];
            esc.host_name.set_flat(host);
            esc.service_description.set_flat(desc);
            esc.meta.from_group = from_group;
        }
        for (host, desc, from_group) in pairs {
            let mut copy = session.serviceescalations[eid].clone();
            copy.host_name.set_flat(host);
            copy.service_description.set_flat(desc);
            copy.meta.from_group = from_group;
            session.serviceescalations.push(copy);
        }
    }
    Ok(())
}

fn duplicate_hostdependencies(session: &mut LoadSession) -> Result<(), LoadError> {
    for did in 0..session.hostdependencies.len() {
        let dep = &session.hostdependencies[did];
        if !dep.meta.register {
            continue;
        }
        let master_groups = dep.hostgroup_name.value().map(str::to_string);
        let master_hosts = dep.host_name.value().map(str::to_string);
        let dep_groups = dep.dependent_hostgroup_name.value().map(str::to_string);
        let dep_hosts = dep.dependent_host_name.value().map(str::to_string);
        if master_groups.is_none()
            && master_hosts.is_none()
            && dep_groups.is_none()
            && dep_hosts.is_none()
        {
            continue;
        }
        let prov = dep.meta.provenance;
        let context = format!(
            "host dependency ({}:{})",
            session.file_name(prov.file),
            prov.line
        );
        if master_groups.is_none() && master_hosts.is_none() {
            return Err(session.parse_error(prov, "host dependency is missing host_name"));
        }
        if dep_groups.is_none() && dep_hosts.is_none() {
            return Err(session.parse_error(prov, "host dependency is missing dependent_host_name"));
        }

        let masters = expand::expand_hostgroups_and_hosts(
            session,
            master_groups.as_deref(),
            master_hosts.as_deref(),
            &context,
        )?;
        let dependents = expand::expand_hostgroups_and_hosts(
            session,
            dep_groups.as_deref(),
            dep_hosts.as_deref(),
            &context,
        )?;
        if masters.is_empty() || dependents.is_empty() {
            return Err(LoadError::UnresolvedMember {
                pattern: master_groups
                    .or(master_hosts)
                    .or(dep_groups)
                    .or(dep_hosts)
                    .unwrap_or_default(),
                context,
            });
        }

        let mut first_item = true;
        for master in &masters {
            for dependent in &dependents {
                let from_group = master.from_group || dependent.from_group;
                if first_item {
                    let dep = &mut session.hostdependencies[did];
                    dep.host_name.set_flat(master.name.clone());
                    dep.dependent_host_name.set_flat(dependent.name.clone());
                    dep.meta.from_group = from_group;
                    first_item = false;
                } else {
                    let mut copy = session.hostdependencies[did].clone();
                    copy.host_name.set_flat(master.name.clone());
                    copy.dependent_host_name.set_flat(dependent.name.clone());
                    copy.meta.from_group = from_group;
                    session.hostdependencies.push(copy);
                }
            }
        }
    }
    Ok(())
}

fn duplicate_servicedependencies(session: &mut LoadSession) -> Result<(), LoadError> {
    for did in 0..session.servicedependencies.len() {
        let dep = &session.servicedependencies[did];
        if !dep.meta.register {
            continue;
        }
        let master_groups = dep.hostgroup_name.value().map(str::to_string);
        let master_hosts = dep.host_name.value().map(str::to_string);
        let dep_groups = dep.dependent_hostgroup_name.value().map(str::to_string);
        let dep_hosts = dep.dependent_host_name.value().map(str::to_string);
        if master_groups.is_none()
            && master_hosts.is_none()
            && dep_groups.is_none()
            && dep_hosts.is_none()
        {
            continue;
        }
        let prov = dep.meta.provenance;
        let context = format!(
            "service dependency ({}:{})",
            session.file_name(prov.file),
            prov.line
        );
        if master_groups.is_none() && master_hosts.is_none() {
            return Err(session.parse_error(prov, "service dependency is missing host_name"));
        }
        if dep_groups.is_none() && dep_hosts.is_none() {
            return Err(
                session.parse_error(prov, "service dependency is missing dependent_host_name")
            );
        }
        let Some(master_svc_spec) = dep.service_description.value().map(str::to_string) else {
            return Err(session.parse_error(prov, "service dependency is missing service_description"));
        };
        let Some(dep_svc_spec) = dep.dependent_service_description.value().map(str::to_string)
        else {
            return Err(session.parse_error(
                prov,
                "service dependency is missing dependent_service_description",
            ));
        };

        let masters = expand::expand_hostgroups_and_hosts(
            session,
            master_groups.as_deref(),
            master_hosts.as_deref(),
            &context,
        )?;
        let dependents = expand::expand_hostgroups_and_hosts(
            session,
            dep_groups.as_deref(),
            dep_hosts.as_deref(),
            &context,
        )?;
        if masters.is_empty() || dependents.is_empty() {
            return Err(LoadError::UnresolvedMember {
                pattern: master_groups
                    .or(master_hosts)
                    .or(dep_groups)
                    .or(dep_hosts)
                    .unwrap_or_default(),
                context,
            });
        }

        // Nested cross product: every master (host, service) paired with
        // every dependent (host, service).
        let mut combos: Vec<(String, String, String, String, bool)> = Vec::new();
        for master in &masters {
            let master_descs =
                expand::expand_services(session, &master.name, &master_svc_spec, &context)?;
            if master_descs.is_empty() {
                return Err(LoadError::UnresolvedMember {
                    pattern: master_svc_spec,
                    context,
                });
            }
            for master_desc in &master_descs {
                for dependent in &dependents {
                    let dep_descs =
                        expand::expand_services(session, &dependent.name, &dep_svc_spec, &context)?;
                    if dep_descs.is_empty() {
                        return Err(LoadError::UnresolvedMember {
                            pattern: dep_svc_spec,
                            context,
                        });
                    }
                    for dep_desc in dep_descs {
                        combos.push((
                            master.name.clone(),
                            master_desc.clone(),
                            dependent.name.clone(),
                            dep_desc,
                            master.from_group || dependent.from_group,
                        ));
                    }
                }
            }
        }

        let mut combos = combos.into_iter();
        if let Some((mh, ms, dh, ds, from_group)) = combos.next() {
            let dep = &mut session.servicedependencies[did];
            dep.host_name.set_flat(mh);
            dep.service_description.set_flat(ms);
            dep.dependent_host_name.set_flat(dh);
            dep.dependent_service_description.set_flat(ds);
            dep.meta.from_group = from_group;
        }
        for (mh, ms, dh, ds, from_group) in combos {
            let mut copy = session.servicedependencies[did].clone();
            copy.host_name.set_flat(mh);
            copy.service_description.set_flat(ms);
            copy.dependent_host_name.set_flat(dh);
            copy.dependent_service_description.set_flat(ds);
            copy.meta.from_group = from_group;
            session.servicedependencies.push(copy);
        }
    }
    Ok(())
}

fn duplicate_hostextinfo(session: &mut LoadSession) -> Result<(), LoadError> {
    for iid in 0..session.hostextinfo.len() {
        let info = &session.hostextinfo[iid];
        if !info.meta.register {
            continue;
        }
        let hostgroups = info.hostgroup_name.value().map(str::to_string);
        let hosts = info.host_name.value().map(str::to_string);
        if hostgroups.is_none() && hosts.is_none() {
            continue;
        }
        let context = format!(
            "host extended info ({}:{})",
            session.file_name(info.meta.provenance.file),
            info.meta.provenance.line
        );

        let members = expand::expand_hostgroups_and_hosts(
            session,
            hostgroups.as_deref(),
            hosts.as_deref(),
            &context,
        )?;
        if members.is_empty() {
            return Err(LoadError::UnresolvedMember {
                pattern: hostgroups.or(hosts).unwrap_or_default(),
                context,
            });
        }

        let mut members = members.into_iter();
        if let Some(first) = members.next() {
            let info = &mut session.hostextinfo[iid];
            info.host_name.set_flat(first.name);
            info.meta.from_group = first.from_group;
        }
        for member in members {
            let mut copy = session.hostextinfo[iid].clone();
            copy.host_name.set_flat(member.name);
            copy.meta.from_group = member.from_group;
            session.hostextinfo.push(copy);
        }
    }
    Ok(())
}

fn duplicate_serviceextinfo(session: &mut LoadSession) -> Result<(), LoadError> {
    for iid in 0..session.serviceextinfo.len() {
        let info = &session.serviceextinfo[iid];
        if !info.meta.register {
            continue;
        }
        let hostgroups = info.hostgroup_name.value().map(str::to_string);
        let hosts = info.host_name.value().map(str::to_string);
        if hostgroups.is_none() && hosts.is_none() {
            continue;
        }
        let context = format!(
            "service extended info ({}:{})",
            session.file_name(info.meta.provenance.file),
            info.meta.provenance.line
        );

        let members = expand::expand_hostgroups_and_hosts(
            session,
            hostgroups.as_deref(),
            hosts.as_deref(),
            &context,
        )?;
        if members.is_empty() {
            return Err(LoadError::UnresolvedMember {
                pattern: hostgroups.or(hosts).unwrap_or_default(),
                context,
            });
        }

        let mut members = members.into_iter();
        if let Some(first) = members.next() {
            let info = &mut session.serviceextinfo[iid];
            info.host_name.set_flat(first.name);
            info.meta.from_group = first.from_group;
        }
        for member in members {
            let mut copy = session.serviceextinfo[iid].clone();
            copy.host_name.set_flat(member.name);
            copy.meta.from_group = member.from_group;
            session.serviceextinfo.push(copy);
        }
    }
    Ok(())
}

/// Fill the link-kind indexes with concrete keys: direct-form records in the
/// first pass, group-derived duplicates in the second. For unique-keyed
/// kinds a direct/direct clash is a hard error while a group-derived record
/// landing on an occupied key is silently dropped (the direct definition
/// wins).
fn rebuild_link_indexes(session: &mut LoadSession) -> Result<(), LoadError> {
    session.service_index.clear();
    session.serviceescalation_index.clear();
    session.hostescalation_index.clear();
    session.servicedependency_index.clear();
    session.hostdependency_index.clear();
    session.hostextinfo_index.clear();
    session.serviceextinfo_index.clear();

    for group_pass in [false, true] {
        // Services: unique (host, description) keys.
        for sid in 0..session.services.len() {
            let svc = &session.services[sid];
            if !svc.meta.register || svc.meta.from_group != group_pass {
                continue;
            }
            let prov = svc.meta.provenance;
            let Some(host) = svc.host_name.value() else {
                return Err(session.parse_error(prov, "service definition is missing host_name"));
            };
            let Some(desc) = svc.service_description.as_deref() else {
                return Err(
                    session.parse_error(prov, "service definition is missing service_description")
                );
            };
            let key = (host.to_string(), desc.to_string());
            if !session.service_index.insert(key, sid) {
                let svc = &session.services[sid];
                let label = format!(
                    "{};{}",
                    svc.host_name.value().unwrap_or(""),
                    svc.service_description.as_deref().unwrap_or("")
                );
                if group_pass {
                    debug!("dropping group-derived duplicate service '{}'", label);
                } else {
                    return Err(LoadError::DuplicateDefinition {
                        kind: ObjectKind::Service,
                        key: label,
                        file: session.file_name(prov.file),
                        line: prov.line,
                    });
                }
            }
        }

        // Host escalations: duplicate keys allowed, direct records first.
        for eid in 0..session.hostescalations.len() {
            let esc = &session.hostescalations[eid];
            if !esc.meta.register || esc.meta.from_group != group_pass {
                continue;
            }
            let prov = esc.meta.provenance;
            let Some(host) = esc.host_name.value() else {
                return Err(session.parse_error(prov, "host escalation is missing host_name"));
            };
            let key = host.to_string();
            session.hostescalation_index.insert(key, eid);
        }

        for eid in 0..session.serviceescalations.len() {
            let esc = &session.serviceescalations[eid];
            if !esc.meta.register || esc.meta.from_group != group_pass {
                continue;
            }
            let prov = esc.meta.provenance;
            let Some(host) = esc.host_name.value() else {
                return Err(session.parse_error(prov, "service escalation is missing host_name"));
            };
            let Some(desc) = esc.service_description.value() else {
                return Err(session
                    .parse_error(prov, "service escalation is missing service_description"));
            };
            let key = (host.to_string(), desc.to_string());
            session.serviceescalation_index.insert(key, eid);
        }

        for did in 0..session.hostdependencies.len() {
            let dep = &session.hostdependencies[did];
            if !dep.meta.register || dep.meta.from_group != group_pass {
                continue;
            }
            let prov = dep.meta.provenance;
            let Some(host) = dep.dependent_host_name.value() else {
                return Err(
                    session.parse_error(prov, "host dependency is missing dependent_host_name")
                );
            };
            let key = host.to_string();
            session.hostdependency_index.insert(key, did);
        }

        for did in 0..session.servicedependencies.len() {
            let dep = &session.servicedependencies[did];
            if !dep.meta.register || dep.meta.from_group != group_pass {
                continue;
            }
            let prov = dep.meta.provenance;
            let Some(host) = dep.dependent_host_name.value() else {
                return Err(
                    session.parse_error(prov, "service dependency is missing dependent_host_name")
                );
            };
            let Some(desc) = dep.dependent_service_description.value() else {
                return Err(session.parse_error(
                    prov,
                    "service dependency is missing dependent_service_description",
                ));
            };
            let key = (host.to_string(), desc.to_string());
            session.servicedependency_index.insert(key, did);
        }

        // Extended info: unique per host / per service.
        for iid in 0..session.hostextinfo.len() {
            let info = &session.hostextinfo[iid];
            if !info.meta.register || info.meta.from_group != group_pass {
                continue;
            }
            let prov = info.meta.provenance;
            let Some(host) = info.host_name.value() else {
                return Err(session.parse_error(prov, "host extended info is missing host_name"));
            };
            let key = host.to_string();
            if !session.hostextinfo_index.insert(key.clone(), iid) {
                if group_pass {
                    debug!("dropping group-derived duplicate hostextinfo '{}'", key);
                } else {
                    return Err(LoadError::DuplicateDefinition {
                        kind: ObjectKind::HostExtInfo,
                        key,
                        file: session.file_name(prov.file),
                        line: prov.line,
                    });
                }
            }
        }

        for iid in 0..session.serviceextinfo.len() {
            let info = &session.serviceextinfo[iid];
            if !info.meta.register || info.meta.from_group != group_pass {
                continue;
            }
            let prov = info.meta.provenance;
            let Some(host) = info.host_name.value() else {
                return Err(
                    session.parse_error(prov, "service extended info is missing host_name")
                );
            };
            let Some(desc) = info.service_description.as_deref() else {
                return Err(session.parse_error(
                    prov,
                    "service extended info is missing service_description",
                ));
            };
            let key = (host.to_string(), desc.to_string());
            if !session.serviceextinfo_index.insert(key.clone(), iid) {
                if group_pass {
                    debug!(
                        "dropping group-derived duplicate serviceextinfo '{};{}'",
                        key.0, key.1
                    );
                } else {
                    return Err(LoadError::DuplicateDefinition {
                        kind: ObjectKind::ServiceExtInfo,
                        key: format!("{};{}", key.0, key.1),
                        file: session.file_name(prov.file),
                        line: prov.line,
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::{recombobulate_contactgroups, recombobulate_hostgroups};
    use crate::parse;
    use crate::resolve;
    use crate::session::{LoadOptions, LoadSession};

    fn duplicated_session(text: &str) -> LoadSession {
        let mut s = LoadSession::new(LoadOptions {
            index_seed: Some(1),
            ..LoadOptions::default()
        });
        parse::process_object_text(&mut s, "test.cfg", text).unwrap();
        resolve::resolve_objects(&mut s).unwrap();
        recombobulate_contactgroups(&mut s).unwrap();
        recombobulate_hostgroups(&mut s).unwrap();
        duplicate_objects(&mut s).unwrap();
        s
    }

    const TWO_HOST_GROUP: &str = "define host {\n\thost_name h1\n}\n\
                                  define host {\n\thost_name h2\n}\n\
                                  define hostgroup {\n\thostgroup_name hg1\n\tmembers h1,h2\n}\n";

    #[test]
    fn test_service_fans_out_per_group_member() {
        let text = TWO_HOST_GROUP.to_string()
            + "define service {\n\thostgroup_name hg1\n\tservice_description ping\n\tcheck_command check_ping\n}\n";
        let s = duplicated_session(&text);
        assert_eq!(s.services.len(), 2);
        let mut hosts: Vec<&str> = s
            .services
            .iter()
            .map(|svc| svc.host_name.value().unwrap_or(""))
            .collect();
        hosts.sort();
        assert_eq!(hosts, vec!["h1", "h2"]);
        // Every copy carries the full attribute set.
        for svc in &s.services {
            assert_eq!(svc.service_description.as_deref(), Some("ping"));
            assert_eq!(svc.check_command.as_deref(), Some("check_ping"));
            assert!(svc.meta.from_group);
            assert!(svc.meta.resolved);
        }
    }

    #[test]
    fn test_fanned_out_copies_keep_custom_vars() {
        let text = TWO_HOST_GROUP.to_string()
            + "define service {\n\thostgroup_name hg1\n\tservice_description http\n\t_PORT 8080\n}\n";
        let s = duplicated_session(&text);
        assert_eq!(s.services.len(), 2);
        for svc in &s.services {
            assert_eq!(svc.custom_vars.len(), 1);
            assert_eq!(svc.custom_vars[0].value, "8080");
        }
    }

    #[test]
    fn test_direct_definition_wins_over_group_duplicate() {
        let text = TWO_HOST_GROUP.to_string()
            + "define service {\n\thostgroup_name hg1\n\tservice_description ping\n\tcheck_interval 10\n}\n\
               define service {\n\thost_name h1\n\tservice_description ping\n\tcheck_interval 1\n}\n";
        let s = duplicated_session(&text);
        // Three records exist (2 fanned out + 1 direct), but the index keeps
        // the direct one for (h1, ping).
        assert_eq!(s.services.len(), 3);
        let key = ("h1".to_string(), "ping".to_string());
        let sid = *s.service_index.find_first(&key).unwrap();
        assert_eq!(s.services[sid].check_interval.value(), Some(&1));
        assert!(!s.services[sid].meta.from_group);
    }

    #[test]
    fn test_two_direct_definitions_with_same_key_is_fatal() {
        let text = "define host {\n\thost_name h1\n}\n\
                    define service {\n\thost_name h1\n\tservice_description ping\n}\n\
                    define service {\n\thost_name h1 \n\tservice_description  ping\n}\n";
        let mut s = LoadSession::new(LoadOptions {
            index_seed: Some(1),
            ..LoadOptions::default()
        });
        parse::process_object_text(&mut s, "test.cfg", text).unwrap();
        resolve::resolve_objects(&mut s).unwrap();
        recombobulate_contactgroups(&mut s).unwrap();
        recombobulate_hostgroups(&mut s).unwrap();
        let err = duplicate_objects(&mut s).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateDefinition { .. }));
    }

    #[test]
    fn test_host_dependency_cross_product() {
        let text = "define host {\n\thost_name m1\n}\n\
                    define host {\n\thost_name m2\n}\n\
                    define host {\n\thost_name d1\n}\n\
                    define host {\n\thost_name d2\n}\n\
                    define hostdependency {\n\thost_name m1,m2\n\tdependent_host_name d1,d2\n}\n";
        let s = duplicated_session(text);
        assert_eq!(s.hostdependencies.len(), 4);
        let mut pairs: Vec<(String, String)> = s
            .hostdependencies
            .iter()
            .map(|d| {
                (
                    d.host_name.value().unwrap_or("").to_string(),
                    d.dependent_host_name.value().unwrap_or("").to_string(),
                )
            })
            .collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("m1".to_string(), "d1".to_string()),
                ("m1".to_string(), "d2".to_string()),
                ("m2".to_string(), "d1".to_string()),
                ("m2".to_string(), "d2".to_string()),
            ]
        );
    }

    #[test]
    fn test_service_escalation_expands_service_wildcard() {
        let text = "define host {\n\thost_name h1\n}\n\
                    define service {\n\thost_name h1\n\tservice_description ping\n}\n\
                    define service {\n\thost_name h1\n\tservice_description ssh\n}\n\
                    define serviceescalation {\n\thost_name h1\n\tservice_description *\n\tfirst_notification 3\n}\n";
        let mut s = LoadSession::new(LoadOptions {
            use_regexp_matching: false,
            index_seed: Some(1),
            ..LoadOptions::default()
        });
        parse::process_object_text(&mut s, "test.cfg", text).unwrap();
        resolve::resolve_objects(&mut s).unwrap();
        recombobulate_contactgroups(&mut s).unwrap();
        recombobulate_hostgroups(&mut s).unwrap();
        duplicate_objects(&mut s).unwrap();
        assert_eq!(s.serviceescalations.len(), 2);
        let mut descs: Vec<&str> = s
            .serviceescalations
            .iter()
            .map(|e| e.service_description.value().unwrap_or(""))
            .collect();
        descs.sort();
        assert_eq!(descs, vec!["ping", "ssh"]);
        for esc in &s.serviceescalations {
            assert_eq!(esc.first_notification.value(), Some(&3));
        }
    }

    #[test]
    fn test_unresolvable_group_reference_is_fatal() {
        let text = "define host {\n\thost_name h1\n}\n\
                    define service {\n\thostgroup_name missing\n\tservice_description ping\n}\n";
        let mut s = LoadSession::new(LoadOptions {
            index_seed: Some(1),
            ..LoadOptions::default()
        });
        parse::process_object_text(&mut s, "test.cfg", text).unwrap();
        resolve::resolve_objects(&mut s).unwrap();
        recombobulate_contactgroups(&mut s).unwrap();
        recombobulate_hostgroups(&mut s).unwrap();
        let err = duplicate_objects(&mut s).unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedMember { .. }));
    }

    #[test]
    fn test_extinfo_duplicates_over_group() {
        let text = TWO_HOST_GROUP.to_string()
            + "define hostextinfo {\n\thostgroup_name hg1\n\tnotes rack b2\n}\n";
        let s = duplicated_session(&text);
        assert_eq!(s.hostextinfo.len(), 2);
        for info in &s.hostextinfo {
            assert_eq!(info.notes.as_deref(), Some("rack b2"));
        }
    }
}
