use rusqlite::Connection;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::{
    open_db, open_db_with_config, BoardDraft, BoardLimits, BoardRepository, BoardRole,
    BoardService, DatabaseConfig, MemberRole, RepoError, RetryPolicy, ServiceError,
    SqliteBoardRepository, User,
};

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn board_service(conn: &Connection, limits: BoardLimits) -> BoardService<SqliteBoardRepository<'_>> {
    BoardService::new(
        SqliteBoardRepository::try_new(conn).unwrap(),
        limits,
        RetryPolicy::default(),
    )
}

fn user(service: &BoardService<SqliteBoardRepository<'_>>, name: &str) -> User {
    service
        .create_user(name, &format!("{name}@example.com"))
        .unwrap()
}

#[test]
fn owner_sees_created_board_and_outsider_does_not() {
    let conn = setup();
    let service = board_service(&conn, BoardLimits::default());
    let owner = user(&service, "owner");
    let outsider = user(&service, "outsider");

    let board = service
        .create_board(owner.id, &BoardDraft::titled(" Launch "))
        .unwrap();
    assert_eq!(board.title, "Launch");
    assert_eq!(board.owner_id, owner.id);

    assert_eq!(service.list_boards(owner.id).unwrap(), vec![board.clone()]);
    assert!(service.list_boards(outsider.id).unwrap().is_empty());
    assert!(matches!(
        service.get_board(outsider.id, board.id),
        Err(ServiceError::PermissionDenied { .. })
    ));
}

#[test]
fn board_count_is_bounded_per_owner() {
    let conn = setup();
    let limits = BoardLimits {
        max_boards_per_user: 2,
        ..BoardLimits::default()
    };
    let service = board_service(&conn, limits);
    let owner = user(&service, "owner");

    service.create_board(owner.id, &BoardDraft::titled("One")).unwrap();
    service.create_board(owner.id, &BoardDraft::titled("Two")).unwrap();
    let err = service
        .create_board(owner.id, &BoardDraft::titled("Three"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::LimitExceeded {
            limit: "max_boards_per_user",
            max: 2
        }
    ));
}

#[test]
fn blank_board_title_is_invalid_input() {
    let conn = setup();
    let service = board_service(&conn, BoardLimits::default());
    let owner = user(&service, "owner");

    let err = service
        .create_board(owner.id, &BoardDraft::titled("   "))
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[test]
fn duplicate_username_is_invalid_input() {
    let conn = setup();
    let service = board_service(&conn, BoardLimits::default());
    user(&service, "ana");

    let err = service.create_user("ana", "other@example.com").unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[test]
fn membership_roles_resolve_and_duplicates_are_rejected() {
    let conn = setup();
    let service = board_service(&conn, BoardLimits::default());
    let owner = user(&service, "owner");
    let admin = user(&service, "admin");
    let member = user(&service, "member");
    let board = service
        .create_board(owner.id, &BoardDraft::titled("Team"))
        .unwrap();

    service
        .add_member(owner.id, board.id, admin.id, MemberRole::Admin)
        .unwrap();
    service
        .add_member(admin.id, board.id, member.id, MemberRole::Member)
        .unwrap();

    assert_eq!(
        service.role_of(board.id, owner.id).unwrap(),
        Some(BoardRole::Owner)
    );
    assert_eq!(
        service.role_of(board.id, admin.id).unwrap(),
        Some(BoardRole::Admin)
    );
    assert_eq!(
        service.role_of(board.id, member.id).unwrap(),
        Some(BoardRole::Member)
    );

    assert!(matches!(
        service.add_member(owner.id, board.id, member.id, MemberRole::Member),
        Err(ServiceError::AlreadyMember { .. })
    ));
    assert!(matches!(
        service.add_member(owner.id, board.id, owner.id, MemberRole::Member),
        Err(ServiceError::AlreadyMember { .. })
    ));
    assert_eq!(service.list_members(member.id, board.id).unwrap().len(), 2);
    assert_eq!(service.list_boards(member.id).unwrap().len(), 1);
}

#[test]
fn only_owner_grants_admin_and_members_cannot_invite() {
    let conn = setup();
    let service = board_service(&conn, BoardLimits::default());
    let owner = user(&service, "owner");
    let admin = user(&service, "admin");
    let member = user(&service, "member");
    let newcomer = user(&service, "newcomer");
    let board = service
        .create_board(owner.id, &BoardDraft::titled("Team"))
        .unwrap();
    service
        .add_member(owner.id, board.id, admin.id, MemberRole::Admin)
        .unwrap();
    service
        .add_member(owner.id, board.id, member.id, MemberRole::Member)
        .unwrap();

    assert!(matches!(
        service.add_member(admin.id, board.id, newcomer.id, MemberRole::Admin),
        Err(ServiceError::PermissionDenied {
            required: BoardRole::Owner,
            ..
        })
    ));
    assert!(matches!(
        service.add_member(member.id, board.id, newcomer.id, MemberRole::Member),
        Err(ServiceError::PermissionDenied {
            required: BoardRole::Admin,
            ..
        })
    ));
}

#[test]
fn member_limits_apply_per_board_and_per_user() {
    let conn = setup();
    let limits = BoardLimits {
        max_boards_per_user: 10,
        max_members_per_board: 1,
        max_memberships_per_user: 1,
    };
    let service = board_service(&conn, limits);
    let owner = user(&service, "owner");
    let first = user(&service, "first");
    let second = user(&service, "second");
    let board_a = service.create_board(owner.id, &BoardDraft::titled("A")).unwrap();
    let board_b = service.create_board(owner.id, &BoardDraft::titled("B")).unwrap();

    service
        .add_member(owner.id, board_a.id, first.id, MemberRole::Member)
        .unwrap();
    assert!(matches!(
        service.add_member(owner.id, board_a.id, second.id, MemberRole::Member),
        Err(ServiceError::LimitExceeded {
            limit: "max_members_per_board",
            ..
        })
    ));
    assert!(matches!(
        service.add_member(owner.id, board_b.id, first.id, MemberRole::Member),
        Err(ServiceError::LimitExceeded {
            limit: "max_memberships_per_user",
            ..
        })
    ));
}

#[test]
fn members_can_leave_and_owner_deletes_board() {
    let conn = setup();
    let service = board_service(&conn, BoardLimits::default());
    let owner = user(&service, "owner");
    let member = user(&service, "member");
    let board = service
        .create_board(owner.id, &BoardDraft::titled("Team"))
        .unwrap();
    service
        .add_member(owner.id, board.id, member.id, MemberRole::Member)
        .unwrap();

    assert!(matches!(
        service.delete_board(member.id, board.id),
        Err(ServiceError::PermissionDenied { .. })
    ));
    service.remove_member(member.id, board.id, member.id).unwrap();
    assert_eq!(service.role_of(board.id, member.id).unwrap(), None);

    service.delete_board(owner.id, board.id).unwrap();
    assert!(matches!(
        service.get_board(owner.id, board.id),
        Err(ServiceError::NotFound { entity: "board", .. })
    ));
    let lists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM lists WHERE board_id = ?1;",
            [board.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(lists, 0);
}

#[test]
fn admin_updates_board_fields() {
    let conn = setup();
    let service = board_service(&conn, BoardLimits::default());
    let owner = user(&service, "owner");
    let board = service
        .create_board(owner.id, &BoardDraft::titled("Draft"))
        .unwrap();

    let draft = BoardDraft {
        title: "Final".to_string(),
        description: Some("Quarterly plan".to_string()),
        color: Some("#00FF7F".to_string()),
        is_public: true,
    };
    let updated = service.update_board(owner.id, board.id, &draft).unwrap();
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.description.as_deref(), Some("Quarterly plan"));
    assert_eq!(updated.color.as_deref(), Some("#00ff7f"));
    assert!(updated.is_public);
}

#[test]
fn public_boards_are_listed_newest_first_for_any_user() {
    let conn = setup();
    let service = board_service(&conn, BoardLimits::default());
    let owner = user(&service, "owner");
    let visitor = user(&service, "visitor");

    let public = |title: &str| BoardDraft {
        is_public: true,
        ..BoardDraft::titled(title)
    };
    let older = service.create_board(owner.id, &public("Older")).unwrap();
    service
        .create_board(owner.id, &BoardDraft::titled("Private"))
        .unwrap();
    let newer = service.create_board(owner.id, &public("Newer")).unwrap();
    for (board_id, created_at) in [(older.id, 1_000_i64), (newer.id, 2_000)] {
        conn.execute(
            "UPDATE boards SET created_at = ?2 WHERE id = ?1;",
            rusqlite::params![board_id.to_string(), created_at],
        )
        .unwrap();
    }

    let titles: Vec<String> = service
        .list_public_boards(visitor.id)
        .unwrap()
        .into_iter()
        .map(|board| board.title)
        .collect();
    assert_eq!(titles, vec!["Newer", "Older"]);
    assert!(service.list_boards(visitor.id).unwrap().is_empty());
    assert!(matches!(
        service.list_public_boards(uuid::Uuid::new_v4()),
        Err(ServiceError::NotFound { entity: "user", .. })
    ));
}

#[test]
fn repeated_membership_insert_is_a_duplicate() {
    let conn = setup();
    let repo = SqliteBoardRepository::try_new(&conn).unwrap();
    let service = board_service(&conn, BoardLimits::default());
    let owner = user(&service, "owner");
    let member = user(&service, "member");
    let board = service
        .create_board(owner.id, &BoardDraft::titled("Team"))
        .unwrap();

    repo.add_membership(board.id, member.id, MemberRole::Member, owner.id)
        .unwrap();
    let err = repo
        .add_membership(board.id, member.id, MemberRole::Admin, owner.id)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Duplicate {
            entity: "membership",
            ..
        }
    ));
    assert!(!err.is_retryable());
}

#[test]
fn write_lock_timeout_is_a_conflict_not_a_domain_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.db");
    let holder = open_db(&path).unwrap();
    let conn = open_db_with_config(&path, &DatabaseConfig { busy_timeout_ms: 50 }).unwrap();
    let service = BoardService::new(
        SqliteBoardRepository::try_new(&conn).unwrap(),
        BoardLimits::default(),
        RetryPolicy {
            max_attempts: 2,
            base_backoff_ms: 0,
        },
    );
    let owner = user(&service, "owner");
    let member = user(&service, "member");
    let board = service
        .create_board(owner.id, &BoardDraft::titled("Team"))
        .unwrap();

    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();
    assert!(matches!(
        service.create_user("fresh", "fresh@example.com"),
        Err(ServiceError::Conflict { attempts: 2, .. })
    ));
    assert!(matches!(
        service.add_member(owner.id, board.id, member.id, MemberRole::Member),
        Err(ServiceError::Conflict { attempts: 2, .. })
    ));
    holder.execute_batch("ROLLBACK;").unwrap();

    service.create_user("fresh", "fresh@example.com").unwrap();
    service
        .add_member(owner.id, board.id, member.id, MemberRole::Member)
        .unwrap();
}
