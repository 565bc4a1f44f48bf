//! End-to-end scenarios over the full stack: registry, sanctions,
//! administration and the decision engine wired together the way a host
//! process would wire them.

use std::sync::Arc;

use vigil_core::storage::Storage;
use vigil_core::{FileStorage, MemoryStorage, Rank, SanctionKind, VPath};
use vigil_policy::{DecisionEngine, NullProbe};
use vigil_registry::{Administration, AuditLog, BanKind, Registry, SitebanGate};
use vigil_sanction::SanctionStore;

struct Stack {
    registry: Arc<Registry>,
    sanctions: Arc<SanctionStore>,
    siteban: Arc<SitebanGate>,
    admin: Administration,
    engine: DecisionEngine,
}

fn stack_on(storage: Arc<dyn Storage>) -> Stack {
    let registry = Arc::new(Registry::open(storage.clone()).unwrap());
    let sanctions = Arc::new(SanctionStore::open(storage.clone()).unwrap());
    let audit = Arc::new(AuditLog::open(storage.clone()).unwrap());
    let siteban = Arc::new(SitebanGate::open(storage.clone(), audit.clone()).unwrap());
    let admin = Administration::new(
        registry.clone(),
        sanctions.clone(),
        siteban.clone(),
        audit.clone(),
        storage,
    );
    let engine = DecisionEngine::new(
        registry.clone(),
        sanctions.clone(),
        audit,
        Arc::new(NullProbe),
    );
    Stack {
        registry,
        sanctions,
        siteban,
        admin,
        engine,
    }
}

fn stack() -> Stack {
    stack_on(Arc::new(MemoryStorage::new()) as Arc<dyn Storage>)
}

fn vpath(s: &str) -> VPath {
    s.parse().unwrap()
}

impl Stack {
    /// Promote a mortal and walk them up the transition graph.
    fn wizard(&self, name: &str, rank: Rank) {
        self.admin.promote_mortal("root", name).unwrap();
        let steps: &[Rank] = match rank {
            Rank::Apprentice => &[],
            Rank::Normal => &[Rank::Normal],
            Rank::Mage => &[Rank::Normal, Rank::Mage],
            _ => &[Rank::Normal, Rank::Mage],
        };
        for step in steps {
            self.registry.set_rank(name, *step).unwrap();
        }
    }
}

#[test]
fn officer_writes_anywhere_stranger_needs_sanction() {
    let s = stack();
    s.wizard("alice", Rank::Mage);
    s.admin.make_domain("root", "Acme", "acm", "alice").unwrap();
    s.wizard("bob", Rank::Apprentice);

    let target = vpath("/d/Acme/domain/x");
    assert!(s.engine.can_write("alice", &target));
    assert!(!s.engine.can_write("bob", &target));

    s.admin
        .grant_sanction("alice", "Acme", "bob", SanctionKind::Write, &VPath::root())
        .unwrap();
    assert!(s.engine.can_write("bob", &target));

    s.admin
        .revoke_sanction("alice", "Acme", "bob", SanctionKind::Write, &VPath::root())
        .unwrap();
    assert!(!s.engine.can_write("bob", &target));
}

#[test]
fn unscoped_grant_covers_every_path() {
    let s = stack();
    s.wizard("owner", Rank::Normal);
    s.wizard("guest", Rank::Apprentice);
    s.admin
        .grant_sanction("owner", "owner", "guest", SanctionKind::Read, &VPath::root())
        .unwrap();

    assert!(s.engine.can_read("guest", &vpath("/w/owner/any/sub/path")));
    assert!(s
        .sanctions
        .exists("owner", "guest", SanctionKind::Read, &vpath("/any/sub/path")));
}

#[test]
fn granting_twice_leaves_one_grant() {
    let s = stack();
    s.wizard("owner", Rank::Normal);
    s.wizard("guest", Rank::Apprentice);
    for _ in 0..2 {
        s.admin
            .grant_sanction("owner", "owner", "guest", SanctionKind::Read, &VPath::root())
            .unwrap();
    }
    assert_eq!(s.sanctions.list_grants("owner", "guest").len(), 1);
}

#[test]
fn removing_a_domain_revokes_both_directions() {
    let s = stack();
    s.wizard("alice", Rank::Mage);
    s.admin.make_domain("root", "Acme", "acm", "alice").unwrap();
    s.wizard("bob", Rank::Apprentice);
    s.admin
        .grant_sanction("alice", "Acme", "bob", SanctionKind::Write, &VPath::root())
        .unwrap();
    s.sanctions
        .grant("bob", "Acme", SanctionKind::Read, &VPath::root())
        .unwrap();

    // First request arms the confirmation, the repeat goes through.
    assert!(s.admin.remove_domain("root", "Acme").is_err());
    s.admin.remove_domain("root", "Acme").unwrap();

    assert!(s.sanctions.list_receivers("Acme").is_empty());
    assert!(!s.sanctions.names_receiver("Acme"));
    assert!(!s.engine.can_write("bob", &vpath("/d/Acme/domain/x")));
}

#[test]
fn demotion_to_mortal_closes_every_door() {
    let s = stack();
    s.wizard("alice", Rank::Mage);
    s.admin.make_domain("root", "Acme", "acm", "alice").unwrap();
    s.wizard("bob", Rank::Normal);
    s.registry.join_domain("bob", "Acme").unwrap();

    assert!(s.engine.can_write("bob", &vpath("/d/Acme/work/x")));
    let _ = s.admin.set_rank("root", "bob", Rank::Mortal);
    s.admin.set_rank("root", "bob", Rank::Mortal).unwrap();

    assert!(!s.engine.can_write("bob", &vpath("/d/Acme/work/x")));
    assert!(!s.engine.can_write("bob", &vpath("/w/bob/notes")));
    assert_eq!(s.registry.rank_of("bob"), Rank::Mortal);
}

#[test]
fn siteban_scenario() {
    let s = stack();
    s.admin
        .add_siteban("root", "10.0.0.*", BanKind::NoNewCharacter, "abuse")
        .unwrap();
    assert_eq!(s.siteban.check("10.0.0.5"), Some(BanKind::NoNewCharacter));
    assert_eq!(s.siteban.check("10.0.1.5"), None);

    // The most restrictive matching pattern wins.
    s.admin
        .add_siteban("root", "10.0.*", BanKind::NoLogin, "worse")
        .unwrap();
    assert_eq!(s.siteban.check("10.0.0.5"), Some(BanKind::NoLogin));
}

#[test]
fn whole_stack_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let storage =
            Arc::new(FileStorage::new(dir.path()).unwrap()) as Arc<dyn Storage>;
        let s = stack_on(storage);
        s.wizard("alice", Rank::Mage);
        s.admin.make_domain("root", "Acme", "acm", "alice").unwrap();
        s.admin
            .grant_sanction("alice", "Acme", "alice", SanctionKind::Read, &VPath::root())
            .unwrap();
        s.admin
            .add_siteban("root", "10.0.0.*", BanKind::NoLogin, "abuse")
            .unwrap();
    }

    let storage = Arc::new(FileStorage::new(dir.path()).unwrap()) as Arc<dyn Storage>;
    let s = stack_on(storage);
    assert_eq!(s.registry.rank_of("alice"), Rank::Lord);
    assert_eq!(s.registry.domain_of("alice").as_deref(), Some("Acme"));
    assert!(s.sanctions.exists_unscoped("Acme", "alice", SanctionKind::Read));
    assert_eq!(s.siteban.check("10.0.0.9"), Some(BanKind::NoLogin));
    assert!(s.engine.can_write("alice", &vpath("/d/Acme/domain/x")));
}
