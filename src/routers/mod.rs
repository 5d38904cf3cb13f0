pub mod playlist;
pub mod root;
pub mod spotify;
pub mod youtube;

pub use playlist::playlist_routes;
pub use root::{health_check_route, root_route};
pub use spotify::spotify_routes;
pub use youtube::youtube_routes;
