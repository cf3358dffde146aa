use std::path::Path;
use taskboard_core::model::{ListId, TaskId, UserId};
use taskboard_core::{
    open_db, open_db_with_config, BoardDraft, BoardLimits, BoardService, DatabaseConfig,
    ListService, NewTask, RetryPolicy, SqliteBoardRepository, SqliteListRepository,
    SqliteTaskRepository, TaskMoveRequest, TaskService,
};

const WORKERS: usize = 4;
const MOVES_PER_WORKER: usize = 25;

struct Seeded {
    owner: UserId,
    lists: [ListId; 2],
    tasks: Vec<TaskId>,
}

fn seed(path: &Path) -> Seeded {
    let conn = open_db(path).unwrap();
    let boards = BoardService::new(
        SqliteBoardRepository::try_new(&conn).unwrap(),
        BoardLimits::default(),
        RetryPolicy::default(),
    );
    let owner = boards.create_user("owner", "owner@example.com").unwrap().id;
    let board = boards
        .create_board(owner, &BoardDraft::titled("Busy"))
        .unwrap();

    let list_service = ListService::new(
        SqliteBoardRepository::try_new(&conn).unwrap(),
        SqliteListRepository::try_new(&conn).unwrap(),
        RetryPolicy::default(),
    );
    let lists = list_service.list_lists(owner, board.id).unwrap();
    let lists = [lists[0].id, lists[1].id];

    let task_service = TaskService::new(
        SqliteBoardRepository::try_new(&conn).unwrap(),
        SqliteListRepository::try_new(&conn).unwrap(),
        SqliteTaskRepository::try_new(&conn).unwrap(),
        RetryPolicy::default(),
    );
    let tasks = (0..WORKERS * 2)
        .map(|index| {
            task_service
                .create_task(owner, lists[index % 2], &NewTask::new(&format!("t{index}")).unwrap())
                .unwrap()
                .id
        })
        .collect();

    Seeded {
        owner,
        lists,
        tasks,
    }
}

#[test]
fn concurrent_moves_on_shared_lists_keep_positions_dense() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    let seeded = seed(&path);
    let database = DatabaseConfig {
        busy_timeout_ms: 10_000,
    };
    let retry = RetryPolicy {
        max_attempts: 5,
        base_backoff_ms: 5,
    };

    std::thread::scope(|scope| {
        for worker in 0..WORKERS {
            let path = path.as_path();
            let seeded = &seeded;
            scope.spawn(move || {
                let conn = open_db_with_config(path, &database).unwrap();
                let service = TaskService::new(
                    SqliteBoardRepository::try_new(&conn).unwrap(),
                    SqliteListRepository::try_new(&conn).unwrap(),
                    SqliteTaskRepository::try_new(&conn).unwrap(),
                    retry,
                );
                // No other worker moves these two tasks, though all reshuffle both lists.
                let owned = [seeded.tasks[worker], seeded.tasks[worker + WORKERS]];
                for step in 0..MOVES_PER_WORKER {
                    let task_id = owned[step % 2];
                    let target = i64::try_from((worker * 7 + step * 3) % 9).unwrap();
                    let request = if step % 3 == 0 {
                        let current = service.get_task(seeded.owner, task_id).unwrap().list_id;
                        let other = if current == seeded.lists[0] {
                            seeded.lists[1]
                        } else {
                            seeded.lists[0]
                        };
                        TaskMoveRequest::to_list(other, Some(target))
                    } else {
                        TaskMoveRequest::to_position(target)
                    };
                    service.move_task(seeded.owner, task_id, request).unwrap();
                }
            });
        }
    });

    let conn = open_db(&path).unwrap();
    let service = TaskService::new(
        SqliteBoardRepository::try_new(&conn).unwrap(),
        SqliteListRepository::try_new(&conn).unwrap(),
        SqliteTaskRepository::try_new(&conn).unwrap(),
        RetryPolicy::default(),
    );
    let mut total = 0;
    for list_id in seeded.lists {
        let positions: Vec<i64> = service
            .list_tasks(seeded.owner, list_id)
            .unwrap()
            .into_iter()
            .map(|task| task.position)
            .collect();
        let expected: Vec<i64> = (1..=i64::try_from(positions.len()).unwrap()).collect();
        assert_eq!(positions, expected);
        total += positions.len();
    }
    assert_eq!(total, WORKERS * 2);
}
