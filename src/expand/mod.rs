//! Group expansion and recombobulation
//!
//! Member specifications are comma lists of tokens: literal names, `*` (all
//! concrete entities of the kind), `!`-prefixed exclusions, and - when regex
//! matching is enabled - extended regular expressions. Expansion accumulates
//! an accept list and a reject list, then subtracts; exclusions always win
//! regardless of token order.
//!
//! Recombobulation flattens group membership in place: entity-side tags
//! (host.hostgroups, contact.contactgroups, service.servicegroups) hoist
//! into the group's member list first, then member lists expand, recursing
//! through subgroups with the subgroup's own member field hidden while it
//! expands so self-references cannot loop. Service groups flatten only after
//! service duplication, because their members exist only after fan-out.

use log::debug;
use regex::Regex;

use crate::errors::LoadError;
use crate::records::Group;
use crate::session::LoadSession;
use crate::skiplist::SkipList;

/// One expanded member name plus how it was reached. Group-derived members
/// feed the second index pass after duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Member {
    pub name: String,
    pub from_group: bool,
}

/// Whether a token should be treated as a regular expression when regex
/// matching is enabled.
fn looks_like_regex(token: &str) -> bool {
    token.chars().any(|c| {
        matches!(
            c,
            '*' | '?' | '+' | '.' | '(' | ')' | '[' | ']' | '^' | '$' | '\\' | '|' | '{' | '}'
        )
    })
}

/// Resolve one token against candidate names. `*` selects everything; a
/// regex token selects every matching candidate; a literal must match
/// exactly one existing name.
fn match_token(
    token: &str,
    candidates: &[String],
    use_regex: bool,
    context: &str,
) -> Result<Vec<String>, LoadError> {
    if token == "*" {
        return Ok(candidates.to_vec());
    }

    if use_regex && looks_like_regex(token) {
        let re = Regex::new(token).map_err(|source| LoadError::InvalidRegex {
            pattern: token.to_string(),
            source,
        })?;
        let matched: Vec<String> = candidates
            .iter()
            .filter(|c| re.is_match(c))
            .cloned()
            .collect();
        if matched.is_empty() {
            return Err(LoadError::UnresolvedMember {
                pattern: token.to_string(),
                context: context.to_string(),
            });
        }
        return Ok(matched);
    }

    if candidates.iter().any(|c| c == token) {
        Ok(vec![token.to_string()])
    } else {
        Err(LoadError::UnresolvedMember {
            pattern: token.to_string(),
            context: context.to_string(),
        })
    }
}

/// Expand a member specification into a flat, de-duplicated name list.
pub(crate) fn expand_member_spec(
    spec: &str,
    candidates: &[String],
    use_regex: bool,
    context: &str,
) -> Result<Vec<String>, LoadError> {
    let mut accept: Vec<String> = Vec::new();
    let mut reject: Vec<String> = Vec::new();

    for raw in spec.split(',') {
        let token = raw.trim();
        if token.is_empty() {
            continue;
        }
        let (negate, pattern) = match token.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, token),
        };
        let matched = match_token(pattern, candidates, use_regex, context)?;
        let target = if negate { &mut reject } else { &mut accept };
        for name in matched {
            if !target.contains(&name) {
                target.push(name);
            }
        }
    }

    accept.retain(|name| !reject.contains(name));
    Ok(accept)
}

/// Expand a hostgroup list plus a host list into one member list. Hostgroup
/// contributions are marked group-derived; a host also named directly is
/// kept direct.
pub(crate) fn expand_hostgroups_and_hosts(
    session: &LoadSession,
    hostgroups: Option<&str>,
    hosts: Option<&str>,
    context: &str,
) -> Result<Vec<Member>, LoadError> {
    let mut accept: Vec<Member> = Vec::new();
    let mut reject: Vec<String> = Vec::new();

    if let Some(spec) = hostgroups {
        let group_names: Vec<String> = session
            .hostgroups
            .iter()
            .filter(|g| g.meta.register)
            .filter_map(|g| g.group_name.as_deref().map(str::to_string))
            .collect();

        for raw in spec.split(',') {
            let token = raw.trim();
            if token.is_empty() {
                continue;
            }
            let (negate, pattern) = match token.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, token),
            };
            for group_name in match_token(pattern, &group_names, session.options.use_regexp_matching, context)? {
                let Some(gid) = session.hostgroup_index.find_first(&group_name).copied() else {
                    return Err(LoadError::UnresolvedMember {
                        pattern: group_name,
                        context: context.to_string(),
                    });
                };
                for member in session.hostgroups[gid].members.names() {
                    if negate {
                        if !reject.iter().any(|r| r == member) {
                            reject.push(member.to_string());
                        }
                    } else if !accept.iter().any(|m| m.name == member) {
                        accept.push(Member {
                            name: member.to_string(),
                            from_group: true,
                        });
                    }
                }
            }
        }
    }

    if let Some(spec) = hosts {
        let host_names: Vec<String> = concrete_host_names(session);
        for raw in spec.split(',') {
            let token = raw.trim();
            if token.is_empty() {
                continue;
            }
            let (negate, pattern) = match token.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, token),
            };
            for name in match_token(pattern, &host_names, session.options.use_regexp_matching, context)? {
                if negate {
                    if !reject.contains(&name) {
                        reject.push(name);
                    }
                } else if let Some(existing) = accept.iter_mut().find(|m| m.name == name) {
                    // Directly named: promote a group-derived entry.
                    existing.from_group = false;
                } else {
                    accept.push(Member {
                        name,
                        from_group: false,
                    });
                }
            }
        }
    }

    accept.retain(|m| !reject.contains(&m.name));
    Ok(accept)
}

/// Expand a service-description specification against the services of one
/// host.
pub(crate) fn expand_services(
    session: &LoadSession,
    host: &str,
    services: &str,
    context: &str,
) -> Result<Vec<String>, LoadError> {
    let candidates: Vec<String> = session
        .services
        .iter()
        .filter(|s| s.meta.register && s.host_name.value() == Some(host))
        .filter_map(|s| s.service_description.as_deref().map(str::to_string))
        .collect();
    expand_member_spec(services, &candidates, session.options.use_regexp_matching, context)
}

pub(crate) fn concrete_host_names(session: &LoadSession) -> Vec<String> {
    session
        .hosts
        .iter()
        .filter(|h| h.meta.register)
        .filter_map(|h| h.host_name.as_deref().map(str::to_string))
        .collect()
}

/// Hoist contact-side group tags, then flatten every contactgroup.
pub(crate) fn recombobulate_contactgroups(session: &mut LoadSession) -> Result<(), LoadError> {
    let mut hoists: Vec<(String, String)> = Vec::new();
    for contact in &session.contacts {
        if !contact.meta.register {
            continue;
        }
        if let Some(name) = contact.contact_name.as_deref() {
            for group in contact.contactgroups.names() {
                hoists.push((group.to_string(), name.to_string()));
            }
        }
    }
    for (group, contact) in hoists {
        let Some(gid) = session.contactgroup_index.find_first(&group).copied() else {
            return Err(LoadError::UnresolvedMember {
                pattern: group,
                context: format!("contact '{}'", contact),
            });
        };
        session.contactgroups[gid].members.append_raw(&contact);
    }

    let candidates: Vec<String> = session
        .contacts
        .iter()
        .filter(|c| c.meta.register)
        .filter_map(|c| c.contact_name.as_deref().map(str::to_string))
        .collect();
    let use_regex = session.options.use_regexp_matching;
    flatten_groups(
        &mut session.contactgroups,
        &session.contactgroup_index,
        &candidates,
        use_regex,
        "contactgroup",
    )
}

/// Hoist host-side group tags, then flatten every hostgroup.
pub(crate) fn recombobulate_hostgroups(session: &mut LoadSession) -> Result<(), LoadError> {
    let mut hoists: Vec<(String, String)> = Vec::new();
    for host in &session.hosts {
        if !host.meta.register {
            continue;
        }
        if let Some(name) = host.host_name.as_deref() {
            for group in host.hostgroups.names() {
                hoists.push((group.to_string(), name.to_string()));
            }
        }
    }
    for (group, host) in hoists {
        let Some(gid) = session.hostgroup_index.find_first(&group).copied() else {
            return Err(LoadError::UnresolvedMember {
                pattern: group,
                context: format!("host '{}'", host),
            });
        };
        session.hostgroups[gid].members.append_raw(&host);
    }

    let candidates = concrete_host_names(session);
    let use_regex = session.options.use_regexp_matching;
    flatten_groups(
        &mut session.hostgroups,
        &session.hostgroup_index,
        &candidates,
        use_regex,
        "hostgroup",
    )
}

/// Hoist service-side group tags, then flatten every servicegroup. Members
/// are (host, description) pairs, so this must run after service fan-out.
pub(crate) fn recombobulate_servicegroups(session: &mut LoadSession) -> Result<(), LoadError> {
    let mut hoists: Vec<(String, String, String)> = Vec::new();
    for service in &session.services {
        if !service.meta.register {
            continue;
        }
        if let (Some(host), Some(desc)) = (
            service.host_name.value(),
            service.service_description.as_deref(),
        ) {
            for group in service.servicegroups.names() {
                hoists.push((group.to_string(), host.to_string(), desc.to_string()));
            }
        }
    }
    for (group, host, desc) in hoists {
        let Some(gid) = session.servicegroup_index.find_first(&group).copied() else {
            return Err(LoadError::UnresolvedMember {
                pattern: group,
                context: format!("service '{};{}'", host, desc),
            });
        };
        let pair = format!("{},{}", host, desc);
        session.servicegroups[gid].members.append_raw(&pair);
    }

    flatten_servicegroups(session)
}

/// Flatten one family of singly-keyed groups (hostgroups or contactgroups).
fn flatten_groups(
    groups: &mut [Group],
    index: &SkipList<String, usize>,
    candidates: &[String],
    use_regex: bool,
    kind_label: &str,
) -> Result<(), LoadError> {
    let mut done = vec![false; groups.len()];
    for gid in 0..groups.len() {
        // Nameless templates cannot be referenced and never flatten; named
        // groups flatten even when unregistered so subgroup references work.
        if groups[gid].group_name.is_unset() {
            continue;
        }
        flatten_one(groups, index, candidates, use_regex, kind_label, gid, &mut done)?;
    }
    Ok(())
}

fn flatten_one(
    groups: &mut [Group],
    index: &SkipList<String, usize>,
    candidates: &[String],
    use_regex: bool,
    kind_label: &str,
    gid: usize,
    done: &mut [bool],
) -> Result<(), LoadError> {
    if done[gid] {
        return Ok(());
    }

    let context = format!(
        "{} '{}'",
        kind_label,
        groups[gid].group_name.as_deref().unwrap_or("?")
    );

    // Hide this group's own fields while it expands; a subgroup chain that
    // loops back contributes nothing instead of recursing forever.
    let raw_members = std::mem::take(&mut groups[gid].members);
    let raw_subgroups = std::mem::take(&mut groups[gid].group_members);

    let mut flat = expand_member_spec(
        raw_members.value().unwrap_or(""),
        candidates,
        use_regex,
        &context,
    )?;

    for sub_name in raw_subgroups.names() {
        let Some(sid) = index.find_first(&sub_name.to_string()).copied() else {
            return Err(LoadError::UnresolvedMember {
                pattern: sub_name.to_string(),
                context,
            });
        };
        flatten_one(groups, index, candidates, use_regex, kind_label, sid, done)?;
        let spliced: Vec<String> = groups[sid]
            .members
            .names()
            .map(str::to_string)
            .collect();
        for member in spliced {
            if !flat.contains(&member) {
                flat.push(member);
            }
        }
    }

    groups[gid].members.set_flat(flat.join(","));
    done[gid] = true;
    Ok(())
}

/// Flatten servicegroups, whose member lists are alternating host,service
/// pairs.
fn flatten_servicegroups(session: &mut LoadSession) -> Result<(), LoadError> {
    let mut done = vec![false; session.servicegroups.len()];
    for gid in 0..session.servicegroups.len() {
        if session.servicegroups[gid].group_name.is_unset() {
            continue;
        }
        flatten_servicegroup(session, gid, &mut done)?;
    }
    Ok(())
}

fn flatten_servicegroup(
    session: &mut LoadSession,
    gid: usize,
    done: &mut [bool],
) -> Result<(), LoadError> {
    if done[gid] {
        return Ok(());
    }

    let context = format!(
        "servicegroup '{}'",
        session.servicegroups[gid].group_name.as_deref().unwrap_or("?")
    );

    let raw_members = std::mem::take(&mut session.servicegroups[gid].members);
    let raw_subgroups = std::mem::take(&mut session.servicegroups[gid].group_members);

    let mut flat: Vec<(String, String)> = Vec::new();
    let tokens: Vec<String> = raw_members.names().map(str::to_string).collect();
    if tokens.len() % 2 != 0 {
        return Err(LoadError::UnresolvedMember {
            pattern: tokens.last().cloned().unwrap_or_default(),
            context: format!("{} (members must be host,service pairs)", context),
        });
    }
    for pair in tokens.chunks(2) {
        let (host, desc) = (pair[0].clone(), pair[1].clone());
        let key = (host.clone(), desc.clone());
        if session.service_index.find_first(&key).is_none() {
            return Err(LoadError::UnresolvedMember {
                pattern: format!("{},{}", host, desc),
                context,
            });
        }
        if !flat.contains(&key) {
            flat.push(key);
        }
    }

    for sub_name in raw_subgroups.names() {
        let Some(sid) = session
            .servicegroup_index
            .find_first(&sub_name.to_string())
            .copied()
        else {
            return Err(LoadError::UnresolvedMember {
                pattern: sub_name.to_string(),
                context,
            });
        };
        flatten_servicegroup(session, sid, done)?;
        let spliced: Vec<String> = session.servicegroups[sid]
            .members
            .names()
            .map(str::to_string)
            .collect();
        for pair in spliced.chunks(2) {
            if pair.len() == 2 {
                let key = (pair[0].clone(), pair[1].clone());
                if !flat.contains(&key) {
                    flat.push(key);
                }
            }
        }
    }

    if flat.is_empty() {
        debug!("servicegroup has no members after flattening");
    }
    let joined = flat
        .iter()
        .map(|(h, s)| format!("{},{}", h, s))
        .collect::<Vec<_>>()
        .join(",");
    session.servicegroups[gid].members.set_flat(joined);
    done[gid] = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::resolve;
    use crate::session::{LoadOptions, LoadSession};

    fn session_with(text: &str, use_regex: bool) -> LoadSession {
        let mut s = LoadSession::new(LoadOptions {
            use_regexp_matching: use_regex,
            index_seed: Some(1),
            ..LoadOptions::default()
        });
        parse::process_object_text(&mut s, "test.cfg", text).unwrap();
        resolve::resolve_objects(&mut s).unwrap();
        s
    }

    fn hosts(n: &[&str]) -> String {
        n.iter()
            .map(|name| format!("define host {{\n\thost_name {}\n}}\n", name))
            .collect()
    }

    #[test]
    fn test_wildcard_selects_all_concrete_hosts() {
        let text = hosts(&["a", "b"])
            + "define host {\n\tname tmpl\n\tregister 0\n}\n\
               define hostgroup {\n\thostgroup_name all\n\tmembers *\n}\n";
        let mut s = session_with(&text, false);
        recombobulate_hostgroups(&mut s).unwrap();
        assert_eq!(s.hostgroups[0].members.value(), Some("a,b"));
    }

    #[test]
    fn test_exclusion_always_wins() {
        let text = hosts(&["a", "b", "c"])
            + "define hostgroup {\n\thostgroup_name most\n\tmembers *,!b\n}\n";
        let mut s = session_with(&text, false);
        recombobulate_hostgroups(&mut s).unwrap();
        assert_eq!(s.hostgroups[0].members.value(), Some("a,c"));
    }

    #[test]
    fn test_exclusion_beats_other_inclusions_regardless_of_order() {
        // `!b` is listed before another token that would re-include b.
        let text = hosts(&["a", "b"])
            + "define hostgroup {\n\thostgroup_name g\n\tmembers !b,*\n}\n";
        let mut s = session_with(&text, false);
        recombobulate_hostgroups(&mut s).unwrap();
        assert_eq!(s.hostgroups[0].members.value(), Some("a"));
    }

    #[test]
    fn test_regex_members_when_enabled() {
        let text = hosts(&["web01", "web02", "db01"])
            + "define hostgroup {\n\thostgroup_name web\n\tmembers ^web[0-9]+$\n}\n";
        let mut s = session_with(&text, true);
        recombobulate_hostgroups(&mut s).unwrap();
        assert_eq!(s.hostgroups[0].members.value(), Some("web01,web02"));
    }

    #[test]
    fn test_invalid_regex_is_fatal() {
        let text = hosts(&["a"]) + "define hostgroup {\n\thostgroup_name g\n\tmembers a[\n}\n";
        let mut s = session_with(&text, true);
        let err = recombobulate_hostgroups(&mut s).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRegex { .. }));
    }

    #[test]
    fn test_unknown_literal_member_is_fatal() {
        let text = hosts(&["a"]) + "define hostgroup {\n\thostgroup_name g\n\tmembers ghost\n}\n";
        let mut s = session_with(&text, false);
        let err = recombobulate_hostgroups(&mut s).unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedMember { .. }));
    }

    #[test]
    fn test_subgroups_splice_recursively() {
        let text = hosts(&["a", "b", "c"])
            + "define hostgroup {\n\thostgroup_name inner\n\tmembers a\n}\n\
               define hostgroup {\n\thostgroup_name mid\n\tmembers b\n\thostgroup_members inner\n}\n\
               define hostgroup {\n\thostgroup_name outer\n\tmembers c\n\thostgroup_members mid\n}\n";
        let mut s = session_with(&text, false);
        recombobulate_hostgroups(&mut s).unwrap();
        let outer = s
            .hostgroups
            .iter()
            .find(|g| g.group_name.as_deref() == Some("outer"))
            .unwrap();
        assert_eq!(outer.members.value(), Some("c,b,a"));
    }

    #[test]
    fn test_self_referencing_subgroup_terminates() {
        let text = hosts(&["a"])
            + "define hostgroup {\n\thostgroup_name g\n\tmembers a\n\thostgroup_members g\n}\n";
        let mut s = session_with(&text, false);
        recombobulate_hostgroups(&mut s).unwrap();
        assert_eq!(s.hostgroups[0].members.value(), Some("a"));
    }

    #[test]
    fn test_host_side_tags_hoisted_before_flattening() {
        let text = "define host {\n\thost_name a\n\thostgroups web\n}\n\
                    define host {\n\thost_name b\n}\n\
                    define hostgroup {\n\thostgroup_name web\n\tmembers b\n}\n";
        let mut s = session_with(text, false);
        recombobulate_hostgroups(&mut s).unwrap();
        assert_eq!(s.hostgroups[0].members.value(), Some("b,a"));
    }

    #[test]
    fn test_expand_hostgroups_marks_group_derived_members() {
        let text = hosts(&["a", "b", "c"])
            + "define hostgroup {\n\thostgroup_name web\n\tmembers a,b\n}\n";
        let mut s = session_with(&text, false);
        recombobulate_hostgroups(&mut s).unwrap();
        let members =
            expand_hostgroups_and_hosts(&s, Some("web"), Some("c,a"), "service 'x'").unwrap();
        assert_eq!(
            members,
            vec![
                Member { name: "a".into(), from_group: false },
                Member { name: "b".into(), from_group: true },
                Member { name: "c".into(), from_group: false },
            ]
        );
    }

    #[test]
    fn test_contactgroup_hoist_and_flatten() {
        let text = "define contact {\n\tcontact_name alice\n\tcontactgroups ops\n}\n\
                    define contact {\n\tcontact_name bob\n}\n\
                    define contactgroup {\n\tcontactgroup_name ops\n\tmembers bob\n}\n";
        let mut s = session_with(text, false);
        recombobulate_contactgroups(&mut s).unwrap();
        assert_eq!(s.contactgroups[0].members.value(), Some("bob,alice"));
    }
}
