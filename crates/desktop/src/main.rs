mod app;

use app::App;

fn main() -> iced::Result {
    env_logger::init();

    iced::application(App::new, App::update, App::view)
        .title("FaceSense")
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(1100.0, 560.0),
            exit_on_close_request: false,
            ..Default::default()
        })
        .run()
}
