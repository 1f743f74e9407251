use redis_unique_queue::config::Config;
use redis_unique_queue::config::secrets::ExposeSecret;

// Both cases touch the same process-wide variables, so they run as one test.
#[test]
fn config_from_env() {
    unsafe {
        std::env::remove_var("REDIS_URL");
        std::env::remove_var("REDIS_POOL_SIZE");
        std::env::remove_var("QUEUE_EXPIRE_SECONDS");
    }
    assert!(Config::from_env().is_err());

    unsafe {
        std::env::set_var("REDIS_URL", "redis://:secret@localhost:6379/0");
        std::env::set_var("REDIS_POOL_SIZE", "8");
        std::env::set_var("QUEUE_EXPIRE_SECONDS", "600");
    }
    let config = Config::from_env().unwrap();
    assert!(Config::load().is_ok());
    assert!(!config.log_level.is_empty());
    assert_eq!(config.redis_pool_size, Some(8));
    assert_eq!(config.queue_options().expire, Some(600));

    let redis = config.redis();
    assert_eq!(redis.url.expose_secret(), "redis://:secret@localhost:6379/0");
    assert_eq!(redis.pool_size, Some(8));

    unsafe {
        std::env::set_var("REDIS_POOL_SIZE", "lots");
    }
    assert!(Config::from_env().is_err());

    unsafe {
        std::env::remove_var("REDIS_URL");
        std::env::remove_var("REDIS_POOL_SIZE");
        std::env::remove_var("QUEUE_EXPIRE_SECONDS");
    }
}
