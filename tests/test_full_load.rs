//! End-to-end load of an on-disk configuration tree
//!
//! Builds a small but representative config in a temp directory - root file,
//! file and directory includes, templates, groups, fan-out - and checks the
//! registered result.

use std::fs;

use tempfile::tempdir;

use hostwatch::records::KindMask;
use hostwatch::register::InMemoryModel;
use hostwatch::session::{LoadOptions, LoadSession};

fn seeded_options() -> LoadOptions {
    LoadOptions {
        index_seed: Some(7),
        ..LoadOptions::default()
    }
}

#[test]
fn test_worked_example_from_tree() {
    let dir = tempdir().unwrap();
    let objects = dir.path().join("objects");
    fs::create_dir(&objects).unwrap();

    fs::write(
        objects.join("templates.cfg"),
        "define host {\n\
         \tname base\n\
         \tcheck_interval 5\n\
         \tmax_check_attempts 3\n\
         \tregister 0\n\
         }\n",
    )
    .unwrap();

    fs::write(
        objects.join("hosts.cfg"),
        "define host {\n\tuse base\n\thost_name h1\n\taddress 10.0.0.1\n}\n\
         define host {\n\tuse base\n\thost_name h2\n\taddress 10.0.0.2\n}\n\
         define hostgroup {\n\thostgroup_name hg1\n\tmembers h1,h2\n}\n",
    )
    .unwrap();

    fs::write(
        objects.join("services.cfg"),
        "define service {\n\
         \thostgroup_name hg1\n\
         \tservice_description ping\n\
         \tcheck_command check_ping\n\
         }\n",
    )
    .unwrap();

    let root = dir.path().join("main.cfg");
    fs::write(&root, "cfg_dir=objects\n").unwrap();

    let mut session = LoadSession::new(seeded_options());
    session.load(&root).unwrap();

    // Template inheritance reached both hosts.
    for name in ["h1", "h2"] {
        let host = session
            .hosts
            .iter()
            .find(|h| h.host_name.as_deref() == Some(name))
            .unwrap();
        assert_eq!(host.check_interval.value(), Some(&5));
        assert_eq!(host.max_check_attempts.value(), Some(&3));
    }

    // One service definition fanned out into one record per group member.
    let mut pairs: Vec<(String, String)> = session
        .services
        .iter()
        .map(|s| {
            (
                s.host_name.value().unwrap().to_string(),
                s.service_description.as_deref().unwrap().to_string(),
            )
        })
        .collect();
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            ("h1".to_string(), "ping".to_string()),
            ("h2".to_string(), "ping".to_string()),
        ]
    );
    for svc in &session.services {
        assert_eq!(svc.check_command.as_deref(), Some("check_ping"));
    }

    let mut model = InMemoryModel::new();
    let summary = session.register(&mut model).unwrap();
    assert_eq!(summary.hosts, 2);
    assert_eq!(summary.hostgroups, 1);
    assert_eq!(summary.services, 2);
    // Group membership turned into one attach call per member.
    assert!(model.attachments.contains(&"hostgroup/hg1 member h1".to_string()));
    assert!(model.attachments.contains(&"hostgroup/hg1 member h2".to_string()));
}

#[test]
fn test_file_include_and_error_provenance() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("broken.cfg"),
        "define host {\n\thost_name h1\n\tnot_a_directive 1\n}\n",
    )
    .unwrap();
    let root = dir.path().join("main.cfg");
    fs::write(&root, "cfg_file=broken.cfg\n").unwrap();

    let mut session = LoadSession::new(seeded_options());
    let err = session.load(&root).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("broken.cfg:3"), "got: {message}");
    assert!(message.contains("not_a_directive"));
}

#[test]
fn test_kind_mask_limits_what_is_loaded() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("objects.cfg"),
        "define host {\n\thost_name h1\n}\n\
         define command {\n\tcommand_name ping\n\tcommand_line /bin/ping\n}\n\
         define timeperiod {\n\ttimeperiod_name 24x7\n\talias always\n\tmonday 00:00-24:00\n}\n",
    )
    .unwrap();
    let root = dir.path().join("main.cfg");
    fs::write(&root, "cfg_file=objects.cfg\n").unwrap();

    let mut session = LoadSession::new(LoadOptions {
        kinds: KindMask::HOSTS | KindMask::COMMANDS,
        index_seed: Some(7),
        ..LoadOptions::default()
    });
    session.load(&root).unwrap();

    assert_eq!(session.hosts.len(), 1);
    assert_eq!(session.commands.len(), 1);
    assert!(session.timeperiods.is_empty());
}

#[test]
fn test_second_session_is_independent() {
    // Reload means a fresh session; the first one keeps its state until
    // dropped.
    let text = "define host {\n\thost_name h1\n}\n";
    let mut first = LoadSession::new(seeded_options());
    first.load_object_text("gen1.cfg", text).unwrap();

    let mut second = LoadSession::new(seeded_options());
    second
        .load_object_text("gen2.cfg", "define host {\n\thost_name h2\n}\n")
        .unwrap();

    assert_eq!(first.hosts.len(), 1);
    assert_eq!(second.hosts.len(), 1);
    assert_eq!(first.hosts[0].host_name.as_deref(), Some("h1"));
    assert_eq!(second.hosts[0].host_name.as_deref(), Some("h2"));
}
