//! When steps for proof lifecycle BDD scenarios.

use super::world::{ProofWorld, checkpoint, run_async};
use chrono::{DateTime, TimeDelta, Utc};
use eyre::WrapErr;
use rstest_bdd_macros::when;

fn poll_at(world: &mut ProofWorld, at: DateTime<Utc>) -> Result<(), eyre::Report> {
    world.stack.clock.set(at);
    let report = run_async(world.stack.manager.poll()).wrap_err("poll verification engine")?;
    world.last_poll = Some(report);
    Ok(())
}

#[when("the scheduled start arrives")]
fn scheduled_start_arrives(world: &mut ProofWorld) -> Result<(), eyre::Report> {
    let start = world.task()?.scheduled_start();
    poll_at(world, start)
}

#[when("the scheduled end arrives")]
fn scheduled_end_arrives(world: &mut ProofWorld) -> Result<(), eyre::Report> {
    let end = world.task()?.scheduled_end();
    poll_at(world, end)
}

#[when("{seconds:i64} seconds pass")]
fn seconds_pass(world: &mut ProofWorld, seconds: i64) {
    world.stack.clock.advance(TimeDelta::seconds(seconds));
    let _expired = run_async(world.stack.manager.tick());
}

#[when(r#"the photo "{photo}" is submitted for the {kind} checkpoint"#)]
fn photo_submitted(
    world: &mut ProofWorld,
    photo: String,
    kind: String,
) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let outcome = run_async(world.stack.manager.submit_proof(
        task_id,
        checkpoint(&kind)?,
        photo.as_bytes(),
    ))
    .wrap_err("submit proof photo")?;
    world.last_outcome = Some(outcome);
    Ok(())
}

#[when(r#"the {kind} checkpoint is rejected because "{reason}""#)]
fn checkpoint_rejected(
    world: &mut ProofWorld,
    kind: String,
    reason: String,
) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    run_async(world.stack.manager.reject(task_id, checkpoint(&kind)?, &reason))
        .wrap_err("reject checkpoint")?;
    Ok(())
}

#[when("the engine restarts")]
fn engine_restarts(world: &mut ProofWorld) -> Result<(), eyre::Report> {
    let restarted = run_async(world.stack.restart()).wrap_err("restart verification engine")?;
    world.stack = restarted;
    Ok(())
}

#[when("the engine polls")]
fn engine_polls(world: &mut ProofWorld) -> Result<(), eyre::Report> {
    let report = run_async(world.stack.manager.poll()).wrap_err("poll verification engine")?;
    world.last_poll = Some(report);
    Ok(())
}
