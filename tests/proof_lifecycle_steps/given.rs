//! Given steps for proof lifecycle BDD scenarios.

use super::world::ProofWorld;
use crate::test_helpers::task_lasting;
use rstest_bdd_macros::given;

#[given(r#"a {minutes:u32} minute task titled "{title}""#)]
fn task_titled(world: &mut ProofWorld, minutes: u32, title: String) {
    let task = task_lasting(&title, i64::from(minutes));
    world.stack.add_task(task.clone());
    world.task = Some(task);
}
