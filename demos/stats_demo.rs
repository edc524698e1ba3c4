use chain_hash::ChainMap;
use clap::Parser;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "num_keys", default_value_t = 1000)]
    num_keys: u64,

    /// Percentage of the keys removed after the fill phase.
    #[arg(short = 'r', long = "remove_percent", default_value_t = 90)]
    remove_percent: u64,
}

fn main() {
    let args = Args::parse();

    let keys: Vec<u64> = (0..args.num_keys).collect();
    let values: Vec<String> = keys.iter().map(|k| format!("value_{k}")).collect();

    println!("Filling ChainMap with {} keys...", keys.len());
    let mut map = ChainMap::new();
    let mut last_buckets = map.bucket_count();
    for (key, value) in keys.iter().zip(&values) {
        map.add(key, value.as_str());
        if map.bucket_count() != last_buckets {
            println!(
                "  grow rehash at {} bindings: {} -> {} buckets",
                map.len(),
                last_buckets,
                map.bucket_count()
            );
            last_buckets = map.bucket_count();
        }
    }
    map.debug_stats().print();

    let to_remove = (keys.len() as u64 * args.remove_percent.min(100) / 100) as usize;
    println!("\nRemoving {} keys...", to_remove);
    for key in &keys[..to_remove] {
        map.remove(key);
        if map.bucket_count() != last_buckets {
            println!(
                "  shrink rehash at {} bindings: {} -> {} buckets",
                map.len(),
                last_buckets,
                map.bucket_count()
            );
            last_buckets = map.bucket_count();
        }
    }
    map.debug_stats().print();

    let missing = keys[to_remove..]
        .iter()
        .filter(|key| map.lookup(key).is_none())
        .count();
    println!("\nLookups of surviving keys that failed: {}", missing);
}
