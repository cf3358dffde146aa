//! Property-based tests for the position manager.
//!
//! Random operation sequences run against SQLite and against a plain
//! `Vec` model with the same clamp rules; both must agree after every step.

use proptest::prelude::*;
use rusqlite::Connection;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::model::board::NewUser;
use taskboard_core::model::{ListId, TaskId, UserId};
use taskboard_core::{
    BoardDraft, BoardRepository, ListRepository, MoveTarget, NewTask,
    SqliteBoardRepository, SqliteListRepository, SqliteTaskRepository, TaskRepository,
};

#[derive(Debug, Clone)]
enum Op {
    Create { list: usize, position: Option<i64> },
    Within { task: usize, position: i64 },
    Across { task: usize, list: usize, position: Option<i64> },
    Delete { task: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..2usize, proptest::option::of(-2..9i64))
            .prop_map(|(list, position)| Op::Create { list, position }),
        3 => (0..32usize, -2..9i64).prop_map(|(task, position)| Op::Within { task, position }),
        2 => (0..32usize, 0..2usize, proptest::option::of(-2..9i64))
            .prop_map(|(task, list, position)| Op::Across { task, list, position }),
        1 => (0..32usize).prop_map(|task| Op::Delete { task }),
    ]
}

fn seed(conn: &Connection) -> (UserId, [ListId; 2]) {
    let boards = SqliteBoardRepository::try_new(conn).unwrap();
    let owner = boards
        .create_user(&NewUser::new("owner", "owner@example.com").unwrap())
        .unwrap();
    let board = boards
        .create_board(owner.id, &BoardDraft::titled("Props"))
        .unwrap();
    let lists = SqliteListRepository::try_new(conn)
        .unwrap()
        .list_lists(board.id)
        .unwrap();
    (owner.id, [lists[0].id, lists[1].id])
}

fn clamp_index(requested: i64, upper: usize) -> usize {
    let upper = i64::try_from(upper.max(1)).unwrap();
    usize::try_from(requested.clamp(1, upper) - 1).unwrap()
}

fn pick(model: &[Vec<TaskId>; 2], index: usize) -> Option<(usize, TaskId)> {
    let all: Vec<(usize, TaskId)> = model
        .iter()
        .enumerate()
        .flat_map(|(list, ids)| ids.iter().map(move |id| (list, *id)))
        .collect();
    if all.is_empty() {
        return None;
    }
    Some(all[index % all.len()])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn positions_match_model_and_stay_dense(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let conn = open_db_in_memory().unwrap();
        let (owner, lists) = seed(&conn);
        let tasks = SqliteTaskRepository::try_new(&conn).unwrap();
        let mut model: [Vec<TaskId>; 2] = [Vec::new(), Vec::new()];

        for (step, op) in ops.into_iter().enumerate() {
            match op {
                Op::Create { list, position } => {
                    let mut new_task = NewTask::new(&format!("task-{step}")).unwrap();
                    new_task.position = position;
                    let created = tasks.create_task(lists[list], owner, &new_task).unwrap();
                    let slot = match position {
                        None => model[list].len(),
                        Some(requested) => clamp_index(requested, model[list].len() + 1),
                    };
                    model[list].insert(slot, created.id);
                }
                Op::Within { task, position } => {
                    let Some((list, task_id)) = pick(&model, task) else { continue };
                    tasks.move_task_within(task_id, position).unwrap();
                    let len = model[list].len();
                    model[list].retain(|id| *id != task_id);
                    model[list].insert(clamp_index(position, len), task_id);
                }
                Op::Across { task, list, position } => {
                    let Some((from, task_id)) = pick(&model, task) else { continue };
                    tasks
                        .move_task_to_list(task_id, lists[list], MoveTarget::from(position))
                        .unwrap();
                    model[from].retain(|id| *id != task_id);
                    // Same-list requests clamp to [1, N] with the task counted,
                    // which matches [1, M + 1] over the list without it.
                    let slot = match position {
                        None => model[list].len(),
                        Some(requested) => clamp_index(requested, model[list].len() + 1),
                    };
                    model[list].insert(slot, task_id);
                }
                Op::Delete { task } => {
                    let Some((list, task_id)) = pick(&model, task) else { continue };
                    tasks.delete_task(task_id).unwrap();
                    model[list].retain(|id| *id != task_id);
                }
            }

            for (list, expected) in lists.iter().zip(model.iter()) {
                let stored = tasks.list_tasks(*list).unwrap();
                let ids: Vec<TaskId> = stored.iter().map(|task| task.id).collect();
                let positions: Vec<i64> = stored.iter().map(|task| task.position).collect();
                let dense: Vec<i64> = (1..=i64::try_from(stored.len()).unwrap()).collect();
                prop_assert_eq!(&ids, expected);
                prop_assert_eq!(positions, dense);
            }
        }
    }
}
