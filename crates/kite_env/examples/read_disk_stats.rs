use kite_env::disk::DiskSpace;

fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());

    let start = std::time::Instant::now();
    match DiskSpace::query(path.as_ref()) {
        Ok(space) => {
            let micros = start.elapsed().as_micros() as u64;
            println!("Disk usage for {}:", path);
            println!("  Allocation unit: {} bytes", space.unit_size);
            println!("  Free units: {}", space.free_units);
            println!("  Total units: {}", space.total_units);
            println!("  Free: {} bytes", space.free_bytes());
            println!("  Total: {} bytes", space.total_bytes());
            println!("Disk stats collected in {} microseconds", micros);
        }
        Err(err) => eprintln!("Cannot determine free space for {}: {}", path, err),
    }
}
