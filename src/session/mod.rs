//! Load session: arenas, indexes, and the pipeline driver
//!
//! One `LoadSession` value owns every record and index produced by a
//! configuration load. The pipeline runs to completion on one thread:
//! ingest, resolve templates, recombobulate contact/host groups, duplicate
//! group-referencing definitions, recombobulate service groups, apply
//! cross-object default inheritance, then register and/or serialize. Any
//! hard error aborts the load; the caller discards the session rather than
//! registering a partially resolved configuration. Reload means dropping the
//! session and building a fresh one.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::constants::{SKIPLIST_MAX_LEVELS, SKIPLIST_PROBABILITY};
use crate::errors::LoadError;
use crate::records::{
    Command, Contact, Group, Host, HostDependency, HostEscalation, HostExtInfo, KindMask,
    Provenance, Service, ServiceDependency, ServiceEscalation, ServiceExtInfo, Timeperiod,
};
use crate::skiplist::{DuplicatePolicy, SkipList};
use crate::{duplicate, expand, parse, reader, register, resolve};

/// Compound key for kinds identified by a (host, description) pair.
pub(crate) type PairKey = (String, String);

/// Knobs for one load.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Which entity kinds to parse and register.
    pub kinds: KindMask,
    /// Treat member tokens containing regex metacharacters as extended
    /// regular expressions.
    pub use_regexp_matching: bool,
    /// Input is an already-flattened cache: skip resolution, duplication and
    /// group recombobulation entirely.
    pub precached: bool,
    /// Fixed seed for index leveling; `None` seeds from entropy. Index shape
    /// only; logical ordering never depends on this.
    pub index_seed: Option<u64>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            kinds: KindMask::all(),
            use_regexp_matching: false,
            precached: false,
            index_seed: None,
        }
    }
}

/// Record counts per kind after a load, for the CLI summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ObjectCounts {
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

/// All state for one configuration load.
pub struct LoadSession {
    pub options: LoadOptions,

    /// Source file-name table; records reference entries by id.
    pub(crate) files: Vec<PathBuf>,

    // Record arenas, one per kind. Index order within an arena is ingestion
    // order; sorted order lives in the indexes.
    pub timeperiods: Vec<Timeperiod>,
    pub commands: Vec<Command>,
    pub contacts: Vec<Contact>,
    pub contactgroups: Vec<Group>,
    pub hosts: Vec<Host>,
    pub hostgroups: Vec<Group>,
    pub services: Vec<Service>,
    pub servicegroups: Vec<Group>,
    pub servicedependencies: Vec<ServiceDependency>,
    pub serviceescalations: Vec<ServiceEscalation>,
    pub hostdependencies: Vec<HostDependency>,
    pub hostescalations: Vec<HostEscalation>,
    pub hostextinfo: Vec<HostExtInfo>,
    pub serviceextinfo: Vec<ServiceExtInfo>,

    // Template-name indexes (template name -> arena id), one per kind,
    // positioned by `ObjectKind::ordinal`.
    pub(crate) template_index: [SkipList<String, usize>; 14],

    // Real-name indexes. Singly-keyed kinds map name -> arena id; dually
    // keyed kinds map (host, description) pairs.
    pub(crate) timeperiod_index: SkipList<String, usize>,
    pub(crate) command_index: SkipList<String, usize>,
    pub(crate) contact_index: SkipList<String, usize>,
    pub(crate) contactgroup_index: SkipList<String, usize>,
    pub(crate) host_index: SkipList<String, usize>,
    pub(crate) hostgroup_index: SkipList<String, usize>,
    pub(crate) servicegroup_index: SkipList<String, usize>,
    pub(crate) service_index: SkipList<PairKey, usize>,
    pub(crate) servicedependency_index: SkipList<PairKey, usize>,
    pub(crate) serviceescalation_index: SkipList<PairKey, usize>,
    pub(crate) serviceextinfo_index: SkipList<PairKey, usize>,
    pub(crate) hostdependency_index: SkipList<String, usize>,
    pub(crate) hostescalation_index: SkipList<String, usize>,
    pub(crate) hostextinfo_index: SkipList<String, usize>,
}

impl LoadSession {
    pub fn new(options: LoadOptions) -> Self {
        let seed = options.index_seed;
        let unique = |n: u64| make_index(seed, n, DuplicatePolicy::Unique);
        let dupes = |n: u64| make_index(seed, n, DuplicatePolicy::DupesAfter);

        let template_index =
            std::array::from_fn(|i| make_index(seed, 100 + i as u64, DuplicatePolicy::Unique));

        LoadSession {
            options,
            files: Vec::new(),
            timeperiods: Vec::new(),
            commands: Vec::new(),
            contacts: Vec::new(),
            contactgroups: Vec::new(),
            hosts: Vec::new(),
            hostgroups: Vec::new(),
            services: Vec::new(),
            servicegroups: Vec::new(),
            servicedependencies: Vec::new(),
            serviceescalations: Vec::new(),
            hostdependencies: Vec::new(),
            hostescalations: Vec::new(),
            hostextinfo: Vec::new(),
            serviceextinfo: Vec::new(),
            template_index,
            timeperiod_index: unique(1),
            command_index: unique(2),
            contact_index: unique(3),
            contactgroup_index: unique(4),
            host_index: unique(5),
            hostgroup_index: unique(6),
            servicegroup_index: unique(7),
            service_index: make_index(seed, 8, DuplicatePolicy::Unique),
            servicedependency_index: make_index(seed, 9, DuplicatePolicy::DupesAfter),
            serviceescalation_index: make_index(seed, 10, DuplicatePolicy::DupesAfter),
            serviceextinfo_index: make_index(seed, 11, DuplicatePolicy::Unique),
            hostdependency_index: dupes(12),
            hostescalation_index: dupes(13),
            hostextinfo_index: unique(14),
        }
    }

    /// Run the full pipeline against a root config file. With pre-cached
    /// input the root IS the flattened object file; there is no include
    /// walk.
    pub fn load(&mut self, root: &Path) -> Result<(), LoadError> {
        if self.options.precached {
            parse::process_object_file(self, root)?;
            return self.run_pipeline();
        }
        let files = reader::discover_object_files(root)?;
        for file in &files {
            parse::process_object_file(self, file)?;
        }
        self.run_pipeline()
    }

    /// Ingest one object file's text directly (no root file, no includes),
    /// then run the pipeline. Used by tests and embedders that assemble
    /// their own text.
    pub fn load_object_text(&mut self, name: &str, text: &str) -> Result<(), LoadError> {
        parse::process_object_text(self, name, text)?;
        self.run_pipeline()
    }

    fn run_pipeline(&mut self) -> Result<(), LoadError> {
        if self.options.precached {
            // Flat pre-sorted input: records went straight into their real
            // indexes during ingestion and carry no templates or group
            // references.
            return Ok(());
        }
        resolve::resolve_objects(self)?;
        expand::recombobulate_contactgroups(self)?;
        expand::recombobulate_hostgroups(self)?;
        duplicate::duplicate_objects(self)?;
        expand::recombobulate_servicegroups(self)?;
        register::inherit_object_properties(self)?;
        Ok(())
    }

    /// Register every flattened, registration-flagged record with `builder`,
    /// walking each kind's index in sorted order.
    pub fn register<B: crate::register::ObjectBuilder>(
        &self,
        builder: &mut B,
    ) -> Result<crate::register::RegistrationSummary, LoadError> {
        register::register_objects(self, builder)
    }

    /// Serialize the flattened configuration back to the `define` grammar.
    pub fn write_cache<W: std::io::Write>(&self, out: &mut W) -> std::io::Result<()> {
        crate::cache::write_cache(self, out)
    }

    pub fn object_counts(&self) -> ObjectCounts {
        ObjectCounts {
            timeperiods: self.timeperiods.len(),
            commands: self.commands.len(),
            contacts: self.contacts.len(),
            contactgroups: self.contactgroups.len(),
            hosts: self.hosts.len(),
            hostgroups: self.hostgroups.len(),
            services: self.services.len(),
            servicegroups: self.servicegroups.len(),
            servicedependencies: self.servicedependencies.len(),
            serviceescalations: self.serviceescalations.len(),
            hostdependencies: self.hostdependencies.len(),
            hostescalations: self.hostescalations.len(),
            hostextinfo: self.hostextinfo.len(),
            serviceextinfo: self.serviceextinfo.len(),
        }
    }

    /// Intern a file path into the file-name table.
    pub(crate) fn add_file(&mut self, path: &Path) -> usize {
        self.files.push(path.to_path_buf());
        self.files.len() - 1
    }

    pub(crate) fn file_name(&self, id: usize) -> String {
        self.files
            .get(id)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    /// Build a parse error carrying provenance.
    pub(crate) fn parse_error(&self, prov: Provenance, reason: impl Into<String>) -> LoadError {
        LoadError::Parse {
            file: self.file_name(prov.file),
            line: prov.line,
            reason: reason.into(),
        }
    }
}

fn make_index<K: Ord, V>(
    seed: Option<u64>,
    stream: u64,
    policy: DuplicatePolicy,
) -> SkipList<K, V> {
    match seed {
        Some(seed) => SkipList::with_seed(
            SKIPLIST_MAX_LEVELS,
            SKIPLIST_PROBABILITY,
            policy,
            seed.wrapping_add(stream),
        ),
        None => SkipList::new(SKIPLIST_MAX_LEVELS, SKIPLIST_PROBABILITY, policy),
    }
}
