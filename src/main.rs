use color_eyre::Result;
use microdiff::engine::Graph;
use microdiff::nn::Network;
use microdiff::train::{predict, train, xor_dataset, TrainConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = TrainConfig::default();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut graph = Graph::new();
    let model = Network::new(&mut graph, &mut rng, 2, &[4, 4, 1])?;
    log::info!("{model}");

    let data = xor_dataset();
    train(&mut graph, &model, &data, &config)?;

    println!("\nFinal predictions:");
    for sample in &data {
        let pred = predict(&mut graph, &model, &sample.inputs)?[0];
        println!(
            "Input {:?} -> Predicted {:.4}  (actual {})",
            sample.inputs, pred, sample.target
        );
    }

    Ok(())
}
