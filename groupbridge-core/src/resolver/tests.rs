use groupbridge_types::{Group, GroupId, Member, MemberKind, UserId, DIRECTORY_ID_OFFSET};
use maplit::hashmap;
use std::sync::Arc;
use tempfile::tempdir;

use super::HybridResolver;
use crate::directory::{DirectoryEntry, MemoryDirectory};
use crate::error::ResolverError;
use crate::identifier::IdentifierMapper;
use crate::local::{LocalGroupStore, MemoryGroupStore};
use crate::settings::directory::DirectorySettings;
use crate::settings::storage::StorageSettings;
use crate::translator::DirectoryGroupTranslator;
use crate::users::{MemoryUserRegistry, UserRegistry};

const GROUPS: &str = "ou=groups,dc=example,dc=org";
const PEOPLE: &str = "ou=people,dc=example,dc=org";

fn group_dn(cn: &str) -> String {
    format!("cn={},{}", cn, GROUPS)
}

fn user_dn(uid: &str) -> String {
    format!("uid={},{}", uid, PEOPLE)
}

fn group(cn: &str, members: &[String]) -> DirectoryEntry {
    DirectoryEntry::new(group_dn(cn))
        .with_attr("objectClass", ["top", "groupOfNames"])
        .with_attr("cn", [cn])
        .with_attr("member", members.iter().cloned())
}

fn user(uid: &str) -> DirectoryEntry {
    DirectoryEntry::new(user_dn(uid))
        .with_attr("objectClass", ["inetOrgPerson"])
        .with_attr("uid", [uid])
}

struct Fixture {
    resolver: HybridResolver,
    directory: Arc<MemoryDirectory>,
    local: Arc<MemoryGroupStore>,
    users: Arc<MemoryUserRegistry>,
}

fn fixture_with(entries: Vec<DirectoryEntry>, settings: DirectorySettings) -> Fixture {
    let directory = Arc::new(MemoryDirectory::with_entries(entries));
    let local = Arc::new(MemoryGroupStore::new());
    let users = Arc::new(MemoryUserRegistry::from_map(hashmap! {
        "Alice".to_string() => 1,
        "Bob".to_string() => 2,
        "Carol".to_string() => 3,
    }));

    let translator =
        DirectoryGroupTranslator::new(directory.clone(), settings, IdentifierMapper::in_memory());
    let resolver = HybridResolver::new(local.clone(), translator, users.clone());
    Fixture {
        resolver,
        directory,
        local,
        users,
    }
}

fn fixture(entries: Vec<DirectoryEntry>) -> Fixture {
    fixture_with(entries, DirectorySettings::default())
}

fn permissive() -> DirectorySettings {
    let mut settings = DirectorySettings::default();
    settings.allow_directory_group_members = true;
    settings
}

async fn directory_id(f: &Fixture, cn: &str) -> GroupId {
    f.resolver
        .get_group_by_name(cn)
        .await
        .unwrap()
        .filter(|g| g.id.is_directory())
        .unwrap_or_else(|| panic!("directory group {} not found", cn))
        .id
}

#[tokio::test]
async fn test_directory_group_shadows_local_group() {
    let f = fixture(vec![group("staff", &[])]);
    let local = f.local.create("staff").await.unwrap();
    f.resolver.create_group("interns").await.unwrap();

    let found = f.resolver.get_group_by_name("staff").await.unwrap().unwrap();
    assert!(found.id.is_directory());
    assert!(!found.is_mutable());
    assert!(f.resolver.is_overloaded("staff").await.unwrap());
    assert!(!f.resolver.is_overloaded("interns").await.unwrap());
    assert!(!f.resolver.is_overloaded("nobody").await.unwrap());

    let groups = f.resolver.get_groups().await.unwrap();
    let staff: Vec<&Group> = groups.iter().filter(|g| g.name == "staff").collect();
    assert_eq!(staff.len(), 1);
    assert_eq!(staff[0].id, found.id);
    assert!(groups.iter().any(|g| g.name == "interns"));
    assert!(!groups.iter().any(|g| g.id == local.id));
}

#[tokio::test]
async fn test_local_lookup_without_directory_match() {
    let f = fixture(vec![group("staff", &[])]);
    let interns = f.resolver.create_group("interns").await.unwrap();

    let found = f.resolver.get_group_by_name("interns").await.unwrap();
    assert_eq!(found, Some(interns.clone()));
    assert_eq!(f.resolver.get_group_by_id(interns.id).await.unwrap(), Some(interns));
    assert_eq!(f.resolver.get_group_by_name("nobody").await.unwrap(), None);
}

#[tokio::test]
async fn test_get_group_by_id_for_directory_groups() {
    let f = fixture(vec![group("staff", &[])]);
    let id = directory_id(&f, "staff").await;

    let group = f.resolver.get_group_by_id(id).await.unwrap().unwrap();
    assert_eq!(group.name, "staff");
    assert_eq!(
        f.resolver.group_name_for_id(id).await.unwrap().as_deref(),
        Some("staff")
    );

    // Unmapped directory id
    assert_eq!(
        f.resolver
            .get_group_by_id(GroupId(DIRECTORY_ID_OFFSET + 77))
            .await
            .unwrap(),
        None
    );

    // Mapped but removed from the directory
    f.directory.remove(&group_dn("staff")).await;
    assert_eq!(f.resolver.get_group_by_id(id).await.unwrap(), None);
    assert!(f.resolver.group_exists(id).await.unwrap());
}

#[tokio::test]
async fn test_group_exists() {
    let f = fixture(vec![group("staff", &[])]);
    let local = f.resolver.create_group("interns").await.unwrap();
    let id = directory_id(&f, "staff").await;

    assert!(f.resolver.group_exists(local.id).await.unwrap());
    assert!(f.resolver.group_exists(id).await.unwrap());
    assert!(!f.resolver.group_exists(GroupId(99)).await.unwrap());
    assert!(!f
        .resolver
        .group_exists(GroupId(DIRECTORY_ID_OFFSET + 50))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_directory_groups_are_immutable() {
    let f = fixture_with(
        vec![group("staff", &[user_dn("alice")]), user("alice")],
        permissive(),
    );
    let local = f.resolver.create_group("interns").await.unwrap();
    let id = directory_id(&f, "staff").await;
    let before = f.local.list().await.unwrap();

    let immutable = |r: Result<(), ResolverError>| {
        assert!(matches!(r, Err(ResolverError::ImmutableEntity(rejected)) if rejected == id));
    };

    immutable(f.resolver.delete_group(id).await);
    immutable(f.resolver.add_user_to_group(id, UserId(1)).await);
    immutable(f.resolver.remove_user_from_group(id, UserId(1)).await);
    immutable(f.resolver.add_group_to_group(id, local.id).await);
    immutable(f.resolver.remove_group_from_group(id, local.id).await);
    immutable(f.resolver.remove_all_members(id).await);
    immutable(
        f.resolver
            .save_group(&Group::directory(id, "staff"))
            .await
            .map(|_| ()),
    );

    assert_eq!(f.local.list().await.unwrap(), before);
    assert_eq!(f.directory.len().await, 2);
    assert!(f
        .resolver
        .is_member(id, Member::User(UserId(1)), false)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_name_collision_with_directory_group() {
    let f = fixture(vec![group("staff", &[])]);

    let err = f.resolver.create_group("staff").await.unwrap_err();
    assert!(matches!(err, ResolverError::NameCollision(ref name) if name == "staff"));

    let mut interns = f.resolver.create_group("interns").await.unwrap();
    interns.name = "staff".to_string();
    let err = f.resolver.save_group(&interns).await.unwrap_err();
    assert!(matches!(err, ResolverError::NameCollision(_)));
    assert!(f.local.get_by_name("staff").await.unwrap().is_none());

    interns.name = "trainees".to_string();
    let saved = f.resolver.save_group(&interns).await.unwrap();
    assert_eq!(saved.name, "trainees");
}

#[tokio::test]
async fn test_asterisk_name_is_matched_literally() {
    let f = fixture(vec![group("staff", &[])]);

    assert!(f.resolver.get_group_by_name("*").await.unwrap().is_none());
    assert!(!f.resolver.is_overloaded("*").await.unwrap());

    let star = f.resolver.create_group("*").await.unwrap();
    assert!(star.id.is_local());
    let found = f.resolver.get_group_by_name("*").await.unwrap().unwrap();
    assert_eq!(found.id, star.id);
    assert!(!f.resolver.is_overloaded("*").await.unwrap());
}

#[tokio::test]
async fn test_save_group_checks_group_members() {
    let f = fixture(vec![]);
    let interns = f.resolver.create_group("interns").await.unwrap();
    let mentors = f.resolver.create_group("mentors").await.unwrap();

    let mut itself = interns.clone();
    itself.members.insert(Member::Group(interns.id));
    let err = f.resolver.save_group(&itself).await.unwrap_err();
    assert!(matches!(err, ResolverError::InvalidMembership(_)));

    let mut unknown = interns.clone();
    unknown.members.insert(Member::Group(GroupId(4242)));
    let err = f.resolver.save_group(&unknown).await.unwrap_err();
    assert!(matches!(err, ResolverError::NotFound(_)));

    let stored = f.local.get_by_id(interns.id).await.unwrap().unwrap();
    assert!(stored.members.is_empty());

    let mut valid = interns.clone();
    valid.members.insert(Member::Group(mentors.id));
    valid.members.insert(Member::User(UserId(1)));
    let saved = f.resolver.save_group(&valid).await.unwrap();
    assert_eq!(saved.members.len(), 2);
}

#[tokio::test]
async fn test_policy_gate_for_directory_children() {
    let f = fixture(vec![group("staff", &[])]);
    let local = f.resolver.create_group("interns").await.unwrap();
    let id = directory_id(&f, "staff").await;

    let err = f.resolver.add_group_to_group(local.id, id).await.unwrap_err();
    assert!(matches!(err, ResolverError::ImmutableEntity(rejected) if rejected == id));
    assert!(f
        .local
        .get_by_id(local.id)
        .await
        .unwrap()
        .unwrap()
        .members
        .is_empty());

    let mut with_member = local.clone();
    with_member.members.insert(Member::Group(id));
    assert!(matches!(
        f.resolver.save_group(&with_member).await,
        Err(ResolverError::ImmutableEntity(_))
    ));
}

#[tokio::test]
async fn test_directory_child_requires_known_dn() {
    let f = fixture_with(vec![], permissive());
    let local = f.resolver.create_group("interns").await.unwrap();

    let err = f
        .resolver
        .add_group_to_group(local.id, GroupId(DIRECTORY_ID_OFFSET + 9))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolverError::NotFound(_)));
}

#[tokio::test]
async fn test_cross_domain_transitivity() {
    // alice -> team (directory) -> staff (directory) -> interns (local)
    let f = fixture_with(
        vec![
            group("team", &[user_dn("alice")]),
            group("staff", &[group_dn("team")]),
            user("alice"),
            user("bob"),
        ],
        permissive(),
    );
    let local = f.resolver.create_group("interns").await.unwrap();
    let staff = directory_id(&f, "staff").await;
    f.resolver.add_group_to_group(local.id, staff).await.unwrap();

    let alice = Member::User(UserId(1));
    let bob = Member::User(UserId(2));
    assert!(f.resolver.is_member(local.id, alice, true).await.unwrap());
    assert!(!f.resolver.is_member(local.id, alice, false).await.unwrap());
    assert!(!f.resolver.is_member(local.id, bob, true).await.unwrap());

    assert!(f.resolver.is_member(staff, alice, true).await.unwrap());
    assert!(!f.resolver.is_member(staff, alice, false).await.unwrap());
    let team = directory_id(&f, "team").await;
    assert!(f.resolver.is_member(team, alice, false).await.unwrap());
    assert!(f
        .resolver
        .is_member(local.id, Member::Group(team), true)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_membership_terminates_on_cycles() {
    let f = fixture(vec![
        group("a", &[group_dn("b")]),
        group("b", &[group_dn("a")]),
        group("c", &[]),
    ]);
    let a = directory_id(&f, "a").await;
    let c = directory_id(&f, "c").await;

    assert!(f.resolver.is_member(a, Member::Group(a), true).await.unwrap());
    assert!(!f.resolver.is_member(c, Member::Group(a), true).await.unwrap());
}

#[tokio::test]
async fn test_local_group_child_is_never_a_directory_member() {
    let f = fixture(vec![group("staff", &[])]);
    let local = f.resolver.create_group("interns").await.unwrap();
    let staff = directory_id(&f, "staff").await;

    assert!(!f
        .resolver
        .is_member(staff, Member::Group(local.id), true)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_lowercase_usernames() {
    let mut settings = DirectorySettings::default();
    settings.lowercase_usernames = true;
    let f = fixture_with(vec![group("staff", &[user_dn("alice")]), user("alice")], settings);
    let staff = directory_id(&f, "staff").await;

    assert!(f
        .resolver
        .is_member(staff, Member::User(UserId(1)), false)
        .await
        .unwrap());
    assert!(!f
        .resolver
        .is_member(staff, Member::User(UserId(2)), false)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_root_detection() {
    let f = fixture(vec![
        group("a", &[group_dn("b")]),
        group("b", &[]),
        group("c", &[]),
    ]);

    let mut roots = f.resolver.translator.root_group_dns().await;
    roots.sort();
    assert_eq!(roots, vec![group_dn("a"), group_dn("c")]);

    // Nested entries are only listed when they sit below a root's DN
    let mut names: Vec<String> = f
        .resolver
        .get_groups()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["a", "c"]);
}

#[tokio::test]
async fn test_get_groups_expands_root_subtrees() {
    let child = DirectoryEntry::new(format!("cn=a-child,{}", group_dn("a")))
        .with_attr("objectClass", ["groupOfNames"])
        .with_attr("cn", ["a-child"]);
    let f = fixture(vec![group("a", &[]), child]);

    let mut names: Vec<String> = f
        .resolver
        .get_groups()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    names.sort();
    // a-child is found as a root and below a; it is listed once
    assert_eq!(names, vec!["a", "a-child"]);
}

#[tokio::test]
async fn test_directory_outage_degrades_to_local_data() {
    let f = fixture(vec![group("staff", &[user_dn("alice")]), user("alice")]);
    let interns = f.resolver.create_group("interns").await.unwrap();
    f.resolver
        .add_user_to_group(interns.id, UserId(1))
        .await
        .unwrap();
    let staff = directory_id(&f, "staff").await;

    f.directory.set_online(false);
    assert!(!f.resolver.directory_available().await);

    let groups = f.resolver.get_groups().await.unwrap();
    assert_eq!(groups, vec![f.local.get_by_id(interns.id).await.unwrap().unwrap()]);
    assert_eq!(
        f.resolver.get_group_by_name("interns").await.unwrap().map(|g| g.id),
        Some(interns.id)
    );
    assert_eq!(f.resolver.get_group_by_id(staff).await.unwrap(), None);
    assert!(f
        .resolver
        .is_member(interns.id, Member::User(UserId(1)), true)
        .await
        .unwrap());
    assert!(!f
        .resolver
        .is_member(staff, Member::User(UserId(1)), true)
        .await
        .unwrap());

    // Local writes keep working, the name check sees no directory group
    f.resolver.create_group("staff").await.unwrap();
}

#[tokio::test]
async fn test_members_of_group() {
    let f = fixture(vec![
        group(
            "staff",
            &[user_dn("alice"), user_dn("dave"), group_dn("team")],
        ),
        group("team", &[]),
        user("alice"),
        user("dave"),
    ]);
    let staff = directory_id(&f, "staff").await;
    let team = directory_id(&f, "team").await;

    // dave has no account
    assert_eq!(
        f.resolver
            .members_of_group(staff, MemberKind::User)
            .await
            .unwrap(),
        vec![Member::User(UserId(1))]
    );
    assert_eq!(
        f.resolver
            .members_of_group(staff, MemberKind::Group)
            .await
            .unwrap(),
        vec![Member::Group(team)]
    );

    let interns = f.resolver.create_group("interns").await.unwrap();
    f.resolver.add_user_to_group(interns.id, UserId(2)).await.unwrap();
    assert_eq!(
        f.resolver
            .members_of_group(interns.id, MemberKind::User)
            .await
            .unwrap(),
        vec![Member::User(UserId(2))]
    );
    assert!(f
        .resolver
        .members_of_group(interns.id, MemberKind::Group)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_groups_of_member_prefers_directory_names() {
    let f = fixture(vec![
        group("staff", &[user_dn("alice")]),
        group("team", &[user_dn("alice")]),
        user("alice"),
    ]);
    let shadowed = f.local.create("staff").await.unwrap();
    f.local
        .add_member(shadowed.id, Member::User(UserId(1)))
        .await
        .unwrap();
    let interns = f.resolver.create_group("interns").await.unwrap();
    f.resolver.add_user_to_group(interns.id, UserId(1)).await.unwrap();

    let groups = f
        .resolver
        .groups_of_member(Member::User(UserId(1)))
        .await
        .unwrap();
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["interns", "staff", "team"]);
    assert!(groups[1].id.is_directory());
    assert_eq!(groups[0].id, interns.id);
}

#[tokio::test]
async fn test_search_matching_groups() {
    let f = fixture(vec![group("DevOps", &[]), group("admins", &[])]);
    let local_devops = f.local.create("DevOps").await.unwrap();
    let frontend = f.resolver.create_group("frontend-devs").await.unwrap();

    let matching = f.resolver.search_matching_groups("dev").await.unwrap();
    assert_eq!(matching.len(), 2);
    assert_eq!(matching["frontend-devs"], frontend.id);
    assert!(matching["DevOps"].is_directory());
    assert_ne!(matching["DevOps"], local_devops.id);
}

#[tokio::test]
async fn test_provision_directory_users() {
    let f = fixture(vec![user("alice"), user("dave"), user("erin")]);

    let mut created = f.resolver.provision_directory_users().await.unwrap();
    created.sort();
    assert_eq!(created, vec!["Dave", "Erin"]);
    assert!(f.users.username_to_id("Dave").await.unwrap().is_some());

    assert!(f.resolver.provision_directory_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_local_mutations() {
    let f = fixture_with(vec![group("staff", &[])], permissive());
    let parent = f.resolver.create_group("parent").await.unwrap();
    let child = f.resolver.create_group("child").await.unwrap();
    let staff = directory_id(&f, "staff").await;

    f.resolver.add_group_to_group(parent.id, child.id).await.unwrap();
    f.resolver.add_group_to_group(parent.id, staff).await.unwrap();
    f.resolver.add_user_to_group(child.id, UserId(3)).await.unwrap();
    assert!(f
        .resolver
        .is_member(parent.id, Member::User(UserId(3)), true)
        .await
        .unwrap());

    assert!(matches!(
        f.resolver.add_user_to_group(child.id, UserId(404)).await,
        Err(ResolverError::NotFound(_))
    ));

    f.resolver.remove_user_from_group(child.id, UserId(3)).await.unwrap();
    assert!(matches!(
        f.resolver.remove_user_from_group(child.id, UserId(3)).await,
        Err(ResolverError::NotFound(_))
    ));

    f.resolver.remove_group_from_group(parent.id, staff).await.unwrap();
    f.resolver.remove_all_members(parent.id).await.unwrap();
    assert!(f
        .resolver
        .get_group_by_id(parent.id)
        .await
        .unwrap()
        .unwrap()
        .members
        .is_empty());

    f.resolver.delete_group(child.id).await.unwrap();
    assert!(matches!(
        f.resolver.delete_group(child.id).await,
        Err(ResolverError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_from_settings_with_disabled_directory_and_files() {
    let dir = tempdir().unwrap();
    let storage = StorageSettings {
        groups_file: Some(dir.path().join("groups.yaml").to_string_lossy().into_owned()),
        id_mapping_file: Some(dir.path().join("mappings.yaml").to_string_lossy().into_owned()),
    };
    let mut directory = DirectorySettings::default();
    directory.enabled = false;

    let resolver = HybridResolver::from_settings(
        &directory,
        &storage,
        Arc::new(MemoryUserRegistry::new()),
    )
    .await
    .unwrap();
    let created = resolver.create_group("admins").await.unwrap();
    drop(resolver);

    let reopened = HybridResolver::from_settings(
        &directory,
        &storage,
        Arc::new(MemoryUserRegistry::new()),
    )
    .await
    .unwrap();
    assert_eq!(
        reopened.get_group_by_name("admins").await.unwrap().map(|g| g.id),
        Some(created.id)
    );
    assert_eq!(reopened.get_groups().await.unwrap().len(), 1);
}
