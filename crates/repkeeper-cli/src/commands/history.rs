use repkeeper_core::Database;

pub fn run(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let workouts = db.workout_history(limit)?;
    println!("{}", serde_json::to_string_pretty(&workouts)?);
    Ok(())
}
